//! # prefsheet
//!
//! A headless interpreter for declarative settings screens.
//!
//! A settings screen is described as data: titled groups of typed rows,
//! some of which open nested screens. `prefsheet` validates such a schema,
//! resolves each row's value through layered value sets, coerces edits to
//! the declared row type, and collects the changes of nested screens into
//! their parent. Rendering is left to the host.
//!
//! ## Quick Start
//!
//! ```rust
//! use prefsheet::{SessionController, StaticDelegate, parse_groups};
//! use serde_json::json;
//!
//! let groups = parse_groups(&json!([{
//!     "title": "General",
//!     "rows": [
//!         {"name": "Age", "identifier": "age", "type": "integer", "value": 0, "edit": true}
//!     ]
//! }]))
//! .unwrap();
//!
//! let mut session = SessionController::new(groups, StaticDelegate::default()).unwrap();
//! session.commit("age", json!("42")).unwrap();
//! assert_eq!(session.finish().unwrap()["age"], json!(42));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema model, parsing, contracts and value storage
//! - [`session`] - Sessions, navigation and host callbacks
//! - [`config`] - Session configuration
//! - [`document`] - JSON and TOML document IO
//! - [`error`] - Error types

#[macro_use]
extern crate log;

pub mod config;

/// Schema model, parsing, contracts and value storage.
pub mod data;

/// JSON and TOML documents.
pub mod document;

pub mod error;

/// Sessions, navigation and host callbacks.
pub mod session;

pub use config::SessionConfig;
pub use data::{
    group::PropertyGroup,
    parse::{groups_to_json, parse_groups, parse_rows},
    registry::{Coercion, RowContract, RowTypeRegistry},
    row::{Choice, PropertyRow, RowKind},
    schema::{RowPosition, Schema},
    store::{IndexedKey, ValueMap, ValueSource, ValueStore, decode_indexed, encode_indexed},
    types::{InteractionKind, KeyboardHint, RowType},
};
pub use error::{CoercionError, NavigationError, Result, SchemaError, SettingsError};
pub use serde_json::Value;
pub use session::{
    controller::{
        Activation, ChoiceDescriptor, CommitOutcome, RowDescriptor, SectionDescriptor,
        SessionController,
    },
    delegate::{ActionHook, SchemaRefresh, SettingsDelegate, StaticDelegate},
    nav::{Dismissal, Session, SessionId, SessionState},
};
