//! Conversion between the wire format and [`PropertyGroup`]s.
//!
//! A document is a sequence of groups, or an object holding that sequence
//! under `groups`:
//!
//! ```json
//! [{
//!   "title": "General",
//!   "rows": [
//!     {"name": "User name", "type": "string", "value": "", "edit": true,
//!      "keyboardHint": "default", "flags": "", "identifier": "user"}
//!   ]
//! }]
//! ```
//!
//! Unknown fields are ignored. Missing required fields are reported as
//! [`SchemaError::MissingField`].

use serde_json::{Map, Value};

use crate::{
    data::{
        group::PropertyGroup,
        registry::RowTypeRegistry,
        row::{Choice, PropertyRow, RowKind},
        types::{KeyboardHint, RowType},
    },
    error::SchemaError,
};

/// Parse a whole schema document.
pub fn parse_groups(document: &Value) -> Result<Vec<PropertyGroup>, SchemaError> {
    let list = match document {
        Value::Object(obj) => obj.get("groups").ok_or_else(|| SchemaError::MissingField {
            path: "document".to_string(),
            field: "groups",
        })?,
        other => other,
    };
    parse_group_list(list, "groups")
}

/// Parse a bare sequence of rows, as returned by a delegate.
pub fn parse_rows(value: &Value) -> Result<Vec<PropertyRow>, SchemaError> {
    parse_row_list(value, "rows")
}

fn parse_group_list(value: &Value, path: &str) -> Result<Vec<PropertyGroup>, SchemaError> {
    let items = value.as_array().ok_or_else(|| SchemaError::NotAList {
        path: path.to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, g)| parse_group(g, &format!("{path}[{i}]")))
        .collect()
}

fn parse_row_list(value: &Value, path: &str) -> Result<Vec<PropertyRow>, SchemaError> {
    let items = value.as_array().ok_or_else(|| SchemaError::NotAList {
        path: path.to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, r)| parse_row(r, &format!("{path}[{i}]")))
        .collect()
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    what: &'static str,
) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::InvalidField {
        path: path.to_string(),
        field: what,
        reason: "expected an object".to_string(),
    })
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    field: &'static str,
) -> Result<&'a Value, SchemaError> {
    obj.get(field).ok_or_else(|| SchemaError::MissingField {
        path: path.to_string(),
        field,
    })
}

fn required_str(
    obj: &Map<String, Value>,
    path: &str,
    field: &'static str,
) -> Result<String, SchemaError> {
    match required(obj, path, field)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    path: &str,
    field: &'static str,
) -> Result<Option<String>, SchemaError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn parse_group(value: &Value, path: &str) -> Result<PropertyGroup, SchemaError> {
    let obj = as_object(value, path, "group")?;
    let title = required_str(obj, path, "title")?;
    let rows = parse_row_list(
        required(obj, path, "rows")?,
        &format!("{path}.rows"),
    )?;
    Ok(PropertyGroup {
        title,
        key: optional_str(obj, path, "key")?,
        header: optional_str(obj, path, "header")?,
        footer: optional_str(obj, path, "footer")?,
        rows,
    })
}

fn parse_row(value: &Value, path: &str) -> Result<PropertyRow, SchemaError> {
    let obj = as_object(value, path, "row")?;
    let name = required_str(obj, path, "name")?;
    let identifier = required_str(obj, path, "identifier")?;

    let type_value = required(obj, path, "type")?;
    let row_type = RowType::from_json(type_value).ok_or_else(|| SchemaError::UnknownRowType {
        path: path.to_string(),
        found: type_value.to_string(),
    })?;

    let editable = match required(obj, path, "edit")? {
        Value::Bool(b) => *b,
        Value::Number(n) if n.as_u64() == Some(0) => false,
        Value::Number(n) if n.as_u64() == Some(1) => true,
        other => {
            return Err(SchemaError::InvalidField {
                path: path.to_string(),
                field: "edit",
                reason: format!("expected a boolean, got {other}"),
            });
        }
    };

    // `kbType` is the key early revisions used.
    let keyboard = match obj.get("keyboardHint").or_else(|| obj.get("kbType")) {
        None => KeyboardHint::Default,
        Some(v) => KeyboardHint::from_json(v).ok_or_else(|| SchemaError::InvalidField {
            path: path.to_string(),
            field: "keyboardHint",
            reason: format!("unknown keyboard {v}"),
        })?,
    };
    let flags = optional_str(obj, path, "flags")?.unwrap_or_default();

    let kind = parse_kind(row_type, obj, path, &name, &identifier)?;

    Ok(PropertyRow {
        name,
        identifier,
        kind,
        editable,
        keyboard,
        flags,
    })
}

fn parse_kind(
    row_type: RowType,
    obj: &Map<String, Value>,
    path: &str,
    name: &str,
    identifier: &str,
) -> Result<RowKind, SchemaError> {
    if row_type.is_structural() {
        let value = obj.get("value").filter(|v| !v.is_null());
        return Ok(match (row_type, value) {
            (RowType::MultiLevel, value) => RowKind::MultiLevel {
                groups: value
                    .map(|v| parse_group_list(v, &format!("{path}.value")))
                    .transpose()?,
            },
            (RowType::PropertyList, value) => RowKind::PropertyList {
                group: value
                    .map(|v| parse_group(v, &format!("{path}.value")).map(Box::new))
                    .transpose()?,
            },
            _ => RowKind::Action,
        });
    }

    let raw = required(obj, path, "value")?;
    if row_type.has_choices() {
        let choices = parse_choices(raw, &format!("{path}.value"))?;
        return Ok(match row_type {
            RowType::PickerList => RowKind::PickerList { choices },
            RowType::PickerView => RowKind::PickerView { choices },
            _ => RowKind::MultiValue { choices },
        });
    }

    // Declared values go through the same conversion as committed ones.
    let probe = PropertyRow::new(name, identifier, RowKind::Default { value: Value::Null });
    let declared = |raw: &Value| {
        RowTypeRegistry::builtin(row_type)
            .coerce(identifier, &probe, raw.clone(), true)
            .map_err(|e| SchemaError::InvalidField {
                path: path.to_string(),
                field: "value",
                reason: e.to_string(),
            })
    };
    let text = |raw: &Value| -> Result<String, SchemaError> {
        match raw {
            Value::Null => Ok(String::new()),
            v => Ok(declared(v)?.as_str().unwrap_or_default().to_string()),
        }
    };

    Ok(match row_type {
        RowType::String => RowKind::String { value: text(raw)? },
        RowType::MultilineText => RowKind::MultilineText { value: text(raw)? },
        RowType::RichText => RowKind::RichText { html: text(raw)? },
        RowType::Integer => RowKind::Integer {
            value: match raw {
                Value::Null => None,
                v => declared(v)?.as_i64(),
            },
        },
        RowType::Decimal => RowKind::Decimal {
            value: match raw {
                Value::Null => None,
                v => declared(v)?.as_f64(),
            },
        },
        RowType::Boolean => RowKind::Boolean {
            value: match raw {
                Value::Null => false,
                v => declared(v)?.as_bool().unwrap_or_default(),
            },
        },
        RowType::Date => RowKind::Date {
            value: match raw {
                Value::Null => None,
                v => declared(v)?.as_str().map(str::to_string),
            },
        },
        RowType::SimpleList => RowKind::SimpleList {
            items: match raw {
                Value::Null => Vec::new(),
                v => match declared(v)? {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                },
            },
        },
        RowType::Custom => RowKind::Custom { value: raw.clone() },
        RowType::Choice => RowKind::Choice { value: raw.clone() },
        _ => RowKind::Default { value: raw.clone() },
    })
}

fn parse_choices(value: &Value, path: &str) -> Result<Vec<Choice>, SchemaError> {
    let items = value.as_array().ok_or_else(|| SchemaError::NotAList {
        path: path.to_string(),
    })?;
    if items.is_empty() {
        return Err(SchemaError::EmptyChoiceSet {
            path: path.to_string(),
        });
    }
    items
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let path = format!("{path}[{i}]");
            let obj = as_object(entry, &path, "choice")?;
            Ok(Choice {
                name: required_str(obj, &path, "name")?,
                value: required(obj, &path, "value")?.clone(),
            })
        })
        .collect()
}

impl PropertyRow {
    /// Canonical wire form of the row.
    pub fn to_json(&self) -> Value {
        let value = match &self.kind {
            RowKind::MultiLevel { groups } => groups
                .as_ref()
                .map_or(Value::Null, |g| groups_to_json(g)),
            RowKind::PropertyList { group } => group.as_ref().map_or(Value::Null, |g| g.to_json()),
            kind if kind.row_type().has_choices() => Value::Array(
                kind.choices()
                    .iter()
                    .map(|c| serde_json::json!({"name": c.name, "value": c.value}))
                    .collect(),
            ),
            kind => kind.declared_value(),
        };
        serde_json::json!({
            "name": self.name,
            "type": self.row_type().name(),
            "value": value,
            "edit": self.editable,
            "keyboardHint": self.keyboard.name(),
            "flags": self.flags,
            "identifier": self.identifier,
        })
    }
}

impl PropertyGroup {
    /// Canonical wire form of the group.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("title".into(), Value::String(self.title.clone()));
        for (field, value) in [("key", &self.key), ("header", &self.header), ("footer", &self.footer)] {
            if let Some(v) = value {
                obj.insert(field.into(), Value::String(v.clone()));
            }
        }
        obj.insert(
            "rows".into(),
            Value::Array(self.rows.iter().map(PropertyRow::to_json).collect()),
        );
        Value::Object(obj)
    }
}

/// Wire form of a group list.
pub fn groups_to_json(groups: &[PropertyGroup]) -> Value {
    Value::Array(groups.iter().map(PropertyGroup::to_json).collect())
}
