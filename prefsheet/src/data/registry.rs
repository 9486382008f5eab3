//! Editing contracts per row type.
//!
//! A [`RowContract`] tells the session how a row is interacted with, whether
//! it opens a child schema, whether it stores a value, and how incoming
//! values are converted to the declared type. Hosts override contracts per
//! type through [`RowTypeRegistry::register`], or per `custom` row through
//! [`SettingsDelegate::custom_contract`](crate::SettingsDelegate::custom_contract).

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate};
use serde_json::{Number, Value};

use crate::{
    data::{
        row::PropertyRow,
        types::{InteractionKind, RowType},
    },
    error::CoercionError,
};

/// Host-supplied conversion. The error string is reported as the reason.
pub type CoerceFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Conversion applied to a value before it is committed.
#[derive(Clone)]
pub enum Coercion {
    /// Accepted unchanged.
    Any,
    /// A string; numbers and booleans are rendered when lenient.
    Text,
    Integer,
    Decimal,
    Boolean,
    /// `YYYY-MM-DD` or RFC 3339. A unix timestamp in seconds when lenient.
    Date,
    /// Sequence of scalars.
    List,
    /// Must match one of the row's choices; the choice value is stored.
    Selection,
    /// Only the row's own declared value is accepted.
    Declared,
    /// The row holds no value; every commit is refused.
    Refuse,
    /// Host conversion, see [`CoerceFn`].
    Custom(CoerceFn),
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coercion::Any => "Any",
            Coercion::Text => "Text",
            Coercion::Integer => "Integer",
            Coercion::Decimal => "Decimal",
            Coercion::Boolean => "Boolean",
            Coercion::Date => "Date",
            Coercion::List => "List",
            Coercion::Selection => "Selection",
            Coercion::Declared => "Declared",
            Coercion::Refuse => "Refuse",
            Coercion::Custom(_) => "Custom(..)",
        };
        f.write_str(name)
    }
}

fn mismatch(key: &str, expected: &str, raw: &Value) -> CoercionError {
    CoercionError::TypeMismatch {
        identifier: key.to_string(),
        expected: expected.to_string(),
        actual: raw.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_) | Value::Null)
}

impl Coercion {
    /// Convert `raw` for the row stored under `key`.
    ///
    /// With `lenient` set, strings are parsed for numeric, boolean and list
    /// types, and dates also accept unix timestamps. Otherwise only the
    /// native representation is accepted, which for dates is a date string.
    pub fn apply(
        &self,
        key: &str,
        row: &PropertyRow,
        raw: Value,
        lenient: bool,
    ) -> Result<Value, CoercionError> {
        match self {
            Coercion::Any => Ok(raw),
            Coercion::Refuse => Err(CoercionError::NotPersisted {
                identifier: key.to_string(),
            }),
            Coercion::Custom(f) => f(&raw).map_err(|reason| CoercionError::Rejected {
                identifier: key.to_string(),
                reason,
            }),
            Coercion::Text => match raw {
                Value::String(_) => Ok(raw),
                Value::Number(_) | Value::Bool(_) if lenient => Ok(Value::String(raw.to_string())),
                _ => Err(mismatch(key, "text", &raw)),
            },
            Coercion::Integer => coerce_integer(&raw, lenient)
                .map(Value::from)
                .ok_or_else(|| mismatch(key, "integer", &raw)),
            Coercion::Decimal => coerce_decimal(&raw, lenient)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch(key, "decimal", &raw)),
            Coercion::Boolean => coerce_boolean(&raw, lenient)
                .map(Value::Bool)
                .ok_or_else(|| mismatch(key, "boolean", &raw)),
            Coercion::Date => coerce_date(&raw, lenient)
                .map(Value::String)
                .ok_or_else(|| mismatch(key, "date", &raw)),
            Coercion::List => match raw {
                Value::Array(ref items) if items.iter().all(is_scalar) => Ok(raw),
                Value::String(ref s) if lenient => Ok(Value::Array(
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                )),
                _ => Err(mismatch(key, "list of scalars", &raw)),
            },
            Coercion::Selection => select_choice(row, &raw, lenient).ok_or_else(|| {
                CoercionError::NotAChoice {
                    identifier: key.to_string(),
                    actual: raw.to_string(),
                }
            }),
            Coercion::Declared => {
                let declared = row.declared_value();
                if raw == declared || (lenient && renders_as(&raw, &declared)) {
                    Ok(declared)
                } else {
                    Err(CoercionError::NotAChoice {
                        identifier: key.to_string(),
                        actual: raw.to_string(),
                    })
                }
            }
        }
    }
}

fn coerce_integer(raw: &Value, lenient: bool) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // i64::MAX is not exactly representable; `<` keeps the cast exact.
            (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
        }),
        Value::String(s) if lenient => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_decimal(raw: &Value, lenient: bool) -> Option<f64> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if lenient => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn coerce_boolean(raw: &Value, lenient: bool) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) if lenient => match n.as_u64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) if lenient => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_date(raw: &Value, lenient: bool) -> Option<String> {
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Some(date.format("%Y-%m-%d").to_string());
            }
            DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.to_rfc3339())
        }
        Value::Number(n) if lenient => {
            let secs = n.as_i64()?;
            DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
        }
        _ => None,
    }
}

/// `raw` is a string spelling `value`.
fn renders_as(raw: &Value, value: &Value) -> bool {
    let Value::String(s) = raw else {
        return false;
    };
    match value {
        Value::String(v) => v == s,
        other => other.to_string() == *s,
    }
}

fn select_choice(row: &PropertyRow, raw: &Value, lenient: bool) -> Option<Value> {
    let choices = row.kind.choices();
    if let Some(choice) = choices.iter().find(|c| &c.value == raw) {
        return Some(choice.value.clone());
    }
    if !lenient {
        return None;
    }
    let Value::String(s) = raw else {
        return None;
    };
    choices
        .iter()
        .find(|c| renders_as(raw, &c.value))
        .or_else(|| choices.iter().find(|c| &c.name == s))
        .map(|c| c.value.clone())
}

/// The editing contract of one row type.
#[derive(Debug, Clone)]
pub struct RowContract {
    /// How a host presents and activates the row.
    pub interaction: InteractionKind,
    /// Activating the row pushes a child session.
    pub recurses: bool,
    /// The row stores a value under its identifier.
    pub persisted: bool,
    /// Applied to every value committed to the row.
    pub coercion: Coercion,
}

impl RowContract {
    pub fn new(interaction: InteractionKind, coercion: Coercion) -> Self {
        Self {
            interaction,
            recurses: false,
            persisted: true,
            coercion,
        }
    }

    fn navigate() -> Self {
        Self {
            interaction: InteractionKind::Navigate,
            recurses: true,
            persisted: false,
            coercion: Coercion::Refuse,
        }
    }

    /// See [`Coercion::apply`].
    pub fn coerce(
        &self,
        key: &str,
        row: &PropertyRow,
        raw: Value,
        lenient: bool,
    ) -> Result<Value, CoercionError> {
        self.coercion.apply(key, row, raw, lenient)
    }
}

/// Maps each [`RowType`] to its [`RowContract`], with host overrides.
#[derive(Debug, Clone, Default)]
pub struct RowTypeRegistry {
    overrides: HashMap<RowType, RowContract>,
}

impl RowTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The contract a row type has when not overridden.
    pub fn builtin(row_type: RowType) -> RowContract {
        use InteractionKind as I;
        match row_type {
            RowType::Default => RowContract::new(I::Display, Coercion::Any),
            RowType::String => RowContract::new(I::TextEntry, Coercion::Text),
            RowType::Integer => RowContract::new(I::TextEntry, Coercion::Integer),
            RowType::Decimal => RowContract::new(I::TextEntry, Coercion::Decimal),
            RowType::Boolean => RowContract::new(I::Toggle, Coercion::Boolean),
            RowType::Date => RowContract::new(I::DateEntry, Coercion::Date),
            RowType::MultilineText => RowContract::new(I::MultilineEntry, Coercion::Text),
            RowType::RichText => RowContract::new(I::Display, Coercion::Text),
            RowType::SimpleList => RowContract::new(I::ListEntry, Coercion::List),
            RowType::Custom => RowContract::new(I::Custom, Coercion::Any),
            RowType::Choice => RowContract::new(I::Selection, Coercion::Declared),
            RowType::MultiValue | RowType::PickerList | RowType::PickerView => {
                RowContract::new(I::Selection, Coercion::Selection)
            }
            RowType::MultiLevel | RowType::PropertyList => RowContract::navigate(),
            RowType::Action => RowContract {
                interaction: I::Trigger,
                recurses: false,
                persisted: false,
                coercion: Coercion::Refuse,
            },
        }
    }

    pub fn contract_for(&self, row_type: RowType) -> RowContract {
        self.overrides
            .get(&row_type)
            .cloned()
            .unwrap_or_else(|| Self::builtin(row_type))
    }

    /// Replace the contract of a type, returning the previous override.
    pub fn register(&mut self, row_type: RowType, contract: RowContract) -> Option<RowContract> {
        self.overrides.insert(row_type, contract)
    }

    /// Drop an override, restoring the builtin contract.
    pub fn reset(&mut self, row_type: RowType) {
        self.overrides.remove(&row_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::row::{Choice, RowKind};
    use serde_json::json;

    fn coerce(row_type: RowType, raw: Value) -> Result<Value, CoercionError> {
        let row = PropertyRow::new("Field", "field", RowKind::Default { value: Value::Null });
        RowTypeRegistry::builtin(row_type).coerce("field", &row, raw, true)
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce(RowType::Integer, json!(42)).unwrap(), json!(42));
        assert_eq!(coerce(RowType::Integer, json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(coerce(RowType::Integer, json!(3.0)).unwrap(), json!(3));
        assert!(coerce(RowType::Integer, json!(3.5)).is_err());
        assert_eq!(
            coerce(RowType::Integer, json!("abc")).unwrap_err(),
            CoercionError::TypeMismatch {
                identifier: "field".into(),
                expected: "integer".into(),
                actual: "\"abc\"".into(),
            }
        );
    }

    #[test]
    fn test_strict_mode() {
        let row = PropertyRow::integer("Age", "age", 0);
        let contract = RowTypeRegistry::builtin(RowType::Integer);
        assert!(contract.coerce("age", &row, json!("42"), false).is_err());
        assert_eq!(contract.coerce("age", &row, json!(42), false).unwrap(), json!(42));
    }

    #[test]
    fn test_decimal_and_boolean() {
        assert_eq!(coerce(RowType::Decimal, json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(coerce(RowType::Decimal, json!(2)).unwrap(), json!(2.0));
        assert!(coerce(RowType::Decimal, json!("NaN")).is_err());
        assert_eq!(coerce(RowType::Boolean, json!("yes")).unwrap(), json!(true));
        assert_eq!(coerce(RowType::Boolean, json!(0)).unwrap(), json!(false));
        assert!(coerce(RowType::Boolean, json!("maybe")).is_err());
    }

    #[test]
    fn test_date_coercion() {
        assert_eq!(
            coerce(RowType::Date, json!("2014-01-19")).unwrap(),
            json!("2014-01-19")
        );
        assert_eq!(
            coerce(RowType::Date, json!(0)).unwrap(),
            json!("1970-01-01T00:00:00+00:00")
        );
        assert!(coerce(RowType::Date, json!("19/01/2014")).is_err());
    }

    #[test]
    fn test_strict_date_needs_a_string() {
        let row = PropertyRow::new("Since", "since", RowKind::Date { value: None });
        let contract = RowTypeRegistry::builtin(RowType::Date);
        assert_eq!(
            contract.coerce("since", &row, json!("2014-01-19"), false).unwrap(),
            json!("2014-01-19")
        );
        assert_eq!(
            contract.coerce("since", &row, json!(0), false).unwrap_err(),
            CoercionError::TypeMismatch {
                identifier: "since".into(),
                expected: "date".into(),
                actual: "0".into(),
            }
        );
    }

    #[test]
    fn test_choice_row_takes_only_its_value() {
        let row = PropertyRow::new("Dark", "theme", RowKind::Choice { value: json!(2) });
        let contract = RowTypeRegistry::builtin(RowType::Choice);
        assert_eq!(contract.coerce("theme", &row, json!(2), false).unwrap(), json!(2));
        assert_eq!(contract.coerce("theme", &row, json!("2"), true).unwrap(), json!(2));
        assert!(contract.coerce("theme", &row, json!("2"), false).is_err());
        assert_eq!(
            contract.coerce("theme", &row, json!("anything"), true).unwrap_err(),
            CoercionError::NotAChoice {
                identifier: "theme".into(),
                actual: "\"anything\"".into(),
            }
        );
        assert!(contract.coerce("theme", &row, json!({"a": 1}), true).is_err());
    }

    #[test]
    fn test_text_and_list() {
        assert_eq!(coerce(RowType::String, json!(12)).unwrap(), json!("12"));
        assert!(coerce(RowType::String, json!({"a": 1})).is_err());
        assert_eq!(
            coerce(RowType::SimpleList, json!("a, b,,c")).unwrap(),
            json!(["a", "b", "c"])
        );
        assert!(coerce(RowType::SimpleList, json!([[1]])).is_err());
    }

    #[test]
    fn test_selection_uses_choice_value() {
        let row = PropertyRow::multi_value(
            "Color",
            "color",
            vec![Choice::new("White", 0), Choice::new("Yellow", 1)],
        );
        let contract = RowTypeRegistry::builtin(RowType::MultiValue);
        assert_eq!(contract.coerce("color", &row, json!(1), true).unwrap(), json!(1));
        assert_eq!(contract.coerce("color", &row, json!("1"), true).unwrap(), json!(1));
        assert_eq!(
            contract.coerce("color", &row, json!("Yellow"), true).unwrap(),
            json!(1)
        );
        assert!(matches!(
            contract.coerce("color", &row, json!(7), true),
            Err(CoercionError::NotAChoice { .. })
        ));
    }

    #[test]
    fn test_structural_contracts() {
        let registry = RowTypeRegistry::new();
        let action = registry.contract_for(RowType::Action);
        assert!(!action.persisted);
        assert_eq!(action.interaction, InteractionKind::Trigger);
        assert!(registry.contract_for(RowType::MultiLevel).recurses);
        assert!(registry.contract_for(RowType::PropertyList).recurses);
        assert!(matches!(
            coerce(RowType::Action, json!(1)),
            Err(CoercionError::NotPersisted { .. })
        ));
    }

    #[test]
    fn test_register_override() {
        let mut registry = RowTypeRegistry::new();
        let upper: CoerceFn = Arc::new(|v: &Value| {
            v.as_str()
                .map(|s| Value::String(s.to_uppercase()))
                .ok_or_else(|| "expected text".to_string())
        });
        registry.register(
            RowType::String,
            RowContract::new(InteractionKind::TextEntry, Coercion::Custom(upper)),
        );
        let row = PropertyRow::string("Code", "code", "");
        let contract = registry.contract_for(RowType::String);
        assert_eq!(contract.coerce("code", &row, json!("ab"), true).unwrap(), json!("AB"));
        assert!(matches!(
            contract.coerce("code", &row, json!(1), true),
            Err(CoercionError::Rejected { .. })
        ));

        registry.reset(RowType::String);
        let contract = registry.contract_for(RowType::String);
        assert_eq!(contract.coerce("code", &row, json!("ab"), true).unwrap(), json!("ab"));
    }
}
