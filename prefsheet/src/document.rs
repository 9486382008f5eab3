//! Reading and writing schema and value documents.
//!
//! Documents are JSON or TOML, chosen by file extension. TOML documents are
//! converted to JSON values on load so the rest of the crate only deals
//! with [`serde_json::Value`].

use std::{fmt, path::Path};

use anyhow::bail;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "toml" | "tml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match Self::from_extension(ext) {
            Some(format) => Ok(format),
            None => bail!("Unsupported document extension: {ext:?}"),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parse `content`. Blank content is an empty mapping.
pub fn parse_document(content: &str, format: Format) -> anyhow::Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value = match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Toml => {
            let v: toml::Value = toml::from_str(content)?;
            serde_json::to_value(v)?
        }
    };
    Ok(value)
}

/// Render `value` in `format`. TOML needs a mapping at the top level and
/// has no null.
pub fn render_document(value: &Value, format: Format) -> anyhow::Result<String> {
    let s = match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Toml => {
            if !value.is_object() {
                bail!("TOML documents must be a table at the top level");
            }
            toml::to_string_pretty(value)?
        }
    };
    Ok(s)
}
