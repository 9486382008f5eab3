//! Document files on disk.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result, bail};
use prefsheet::{
    PropertyGroup, SessionConfig, Value, ValueMap,
    document::{Format, parse_document, render_document},
    parse_groups,
};
use tokio::fs;

pub async fn load_document(path: &Path) -> Result<Value> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content, format).with_context(|| format!("failed to parse {}", path.display()))
}

pub async fn load_schema(path: &Path) -> Result<Vec<PropertyGroup>> {
    let document = load_document(path).await?;
    let groups = parse_groups(&document).with_context(|| format!("invalid schema {}", path.display()))?;
    debug!("loaded {} groups from {}", groups.len(), path.display());
    Ok(groups)
}

/// A value mapping file, or an empty mapping when `path` is `None`.
pub async fn load_values(path: Option<&Path>) -> Result<ValueMap> {
    let Some(path) = path else {
        return Ok(ValueMap::new());
    };
    match load_document(path).await? {
        Value::Object(map) => Ok(map),
        other => bail!(
            "{}: expected a mapping of identifiers to values, got {}",
            path.display(),
            kind_of(&other)
        ),
    }
}

pub async fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let value = load_document(path).await?;
    serde_json::from_value(value).with_context(|| format!("invalid config {}", path.display()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Sibling path an existing file is copied to before being overwritten:
/// `settings.toml` becomes `settings.bk-<secs>.toml`.
pub fn backup_path(path: &Path, secs: u64) -> PathBuf {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    path.with_extension(format!("bk-{secs}.{ext}"))
}

/// Write `value` to `path` in the format its extension names, keeping a
/// timestamped backup of any previous content.
pub async fn save_document(path: &Path, value: &Value) -> Result<Option<PathBuf>> {
    let format = Format::from_path(path)?;
    let s = render_document(value, format)?;

    let mut backup = None;
    if fs::try_exists(path).await? {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        let bk = backup_path(path, secs);
        fs::copy(path, &bk).await?;
        backup = Some(bk);
    }
    fs::write(path, s)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(backup)
}
