//! Session behaviour knobs.
//!
//! Usually embedded in a host's own TOML/JSON configuration:
//!
//! ```toml
//! max_nesting = 4
//! lenient_strings = false
//! notify_unchanged = true
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration of a [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Deepest nesting level a child session may have (root is 0).
    pub max_nesting: usize,
    /// Parse strings committed to integer, decimal, boolean and list rows,
    /// and take unix timestamps for date rows.
    ///
    /// When false, only native JSON numbers and booleans are accepted, and
    /// date rows only take date strings.
    pub lenient_strings: bool,
    /// Notify the delegate even when a commit leaves the value unchanged.
    pub notify_unchanged: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_nesting: 8,
            lenient_strings: true,
            notify_unchanged: false,
        }
    }
}
