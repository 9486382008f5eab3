use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of row types. Each one carries its own editing contract,
/// see [`RowTypeRegistry`](crate::data::registry::RowTypeRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowType {
    /// Plain row showing its value.
    Default,
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    MultilineText,
    RichText,
    SimpleList,
    /// Host-drawn row; the delegate may replace its contract.
    Custom,
    /// Leaf of a multi-value set.
    Choice,
    /// Opens a child session over a nested group list.
    MultiLevel,
    /// Selection from the row's own choice set.
    MultiValue,
    PickerList,
    PickerView,
    /// Opens a child session over a single nested section.
    PropertyList,
    /// Fires a host side effect, holds no value.
    Action,
}

impl RowType {
    /// Every row type, in declaration order.
    pub const ALL: [RowType; 17] = [
        RowType::Default,
        RowType::String,
        RowType::Integer,
        RowType::Decimal,
        RowType::Boolean,
        RowType::Date,
        RowType::MultilineText,
        RowType::RichText,
        RowType::SimpleList,
        RowType::Custom,
        RowType::Choice,
        RowType::MultiLevel,
        RowType::MultiValue,
        RowType::PickerList,
        RowType::PickerView,
        RowType::PropertyList,
        RowType::Action,
    ];

    /// Wire name of the type.
    pub fn name(self) -> &'static str {
        match self {
            RowType::Default => "default",
            RowType::String => "string",
            RowType::Integer => "integer",
            RowType::Decimal => "decimal",
            RowType::Boolean => "boolean",
            RowType::Date => "date",
            RowType::MultilineText => "multilineText",
            RowType::RichText => "richText",
            RowType::SimpleList => "simpleList",
            RowType::Custom => "custom",
            RowType::Choice => "choice",
            RowType::MultiLevel => "multiLevel",
            RowType::MultiValue => "multiValue",
            RowType::PickerList => "pickerList",
            RowType::PickerView => "pickerView",
            RowType::PropertyList => "propertyList",
            RowType::Action => "action",
        }
    }

    /// Look a type up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Numeric codes used by early schema revisions.
    pub fn from_legacy_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => RowType::Default,
            1 => RowType::String,
            2 => RowType::Integer,
            3 => RowType::Boolean,
            4 => RowType::SimpleList,
            5 => RowType::Choice,
            10 => RowType::MultiLevel,
            11 => RowType::MultiValue,
            12 => RowType::PropertyList,
            13 => RowType::Action,
            _ => return None,
        })
    }

    /// Accepts either a wire name or a legacy numeric code.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::from_name(s),
            Value::Number(n) => n.as_u64().and_then(Self::from_legacy_code),
            _ => None,
        }
    }

    /// Rows of these types open a child session instead of holding a scalar.
    pub fn is_nesting(self) -> bool {
        matches!(self, RowType::MultiLevel | RowType::PropertyList)
    }

    /// Rows exempt from identifier uniqueness.
    pub fn is_structural(self) -> bool {
        self.is_nesting() || self == RowType::Action
    }

    /// Rows whose value is picked from a declared choice set.
    pub fn has_choices(self) -> bool {
        matches!(
            self,
            RowType::MultiValue | RowType::PickerList | RowType::PickerView
        )
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyboard the presentation layer should offer for text entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyboardHint {
    /// The platform's general keyboard.
    #[default]
    Default,
    Ascii,
    NumbersAndPunctuation,
    Url,
    /// Digits only.
    NumberPad,
    PhonePad,
    NamePhonePad,
    Email,
    DecimalPad,
    Twitter,
    WebSearch,
}

impl KeyboardHint {
    const ALL: [KeyboardHint; 11] = [
        KeyboardHint::Default,
        KeyboardHint::Ascii,
        KeyboardHint::NumbersAndPunctuation,
        KeyboardHint::Url,
        KeyboardHint::NumberPad,
        KeyboardHint::PhonePad,
        KeyboardHint::NamePhonePad,
        KeyboardHint::Email,
        KeyboardHint::DecimalPad,
        KeyboardHint::Twitter,
        KeyboardHint::WebSearch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KeyboardHint::Default => "default",
            KeyboardHint::Ascii => "ascii",
            KeyboardHint::NumbersAndPunctuation => "numbersAndPunctuation",
            KeyboardHint::Url => "url",
            KeyboardHint::NumberPad => "numberPad",
            KeyboardHint::PhonePad => "phonePad",
            KeyboardHint::NamePhonePad => "namePhonePad",
            KeyboardHint::Email => "email",
            KeyboardHint::DecimalPad => "decimalPad",
            KeyboardHint::Twitter => "twitter",
            KeyboardHint::WebSearch => "webSearch",
        }
    }

    /// Accepts a name or the platform's numeric keyboard code.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::ALL.into_iter().find(|k| k.name() == s),
            Value::Number(n) => n
                .as_u64()
                .and_then(|i| Self::ALL.get(usize::try_from(i).ok()?).copied()),
            Value::Null => Some(KeyboardHint::Default),
            _ => None,
        }
    }
}

/// How the presentation layer lets the user interact with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    /// Value is shown, not edited in place.
    Display,
    /// Single-line text field.
    TextEntry,
    MultilineEntry,
    /// Flips a boolean on activation.
    Toggle,
    DateEntry,
    /// Comma-separated entry of a scalar list.
    ListEntry,
    /// Pick one entry of a choice set.
    Selection,
    /// Opens a child session.
    Navigate,
    /// Fires a side effect.
    Trigger,
    /// Behaviour is decided by the host.
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_type_names_round_trip() {
        for t in RowType::ALL {
            assert_eq!(RowType::from_name(t.name()), Some(t));
        }
        assert_eq!(RowType::from_name("integer32"), None);
    }

    #[test]
    fn test_legacy_codes() {
        assert_eq!(RowType::from_json(&json!(10)), Some(RowType::MultiLevel));
        assert_eq!(RowType::from_json(&json!(12)), Some(RowType::PropertyList));
        assert_eq!(RowType::from_json(&json!(6)), None);
        assert_eq!(RowType::from_json(&json!("pickerView")), Some(RowType::PickerView));
    }

    #[test]
    fn test_keyboard_hint() {
        assert_eq!(KeyboardHint::from_json(&json!(4)), Some(KeyboardHint::NumberPad));
        assert_eq!(KeyboardHint::from_json(&json!("email")), Some(KeyboardHint::Email));
        assert_eq!(KeyboardHint::from_json(&json!(99)), None);
    }

    #[test]
    fn test_structural_types() {
        assert!(RowType::Action.is_structural());
        assert!(RowType::MultiLevel.is_nesting());
        assert!(!RowType::MultiValue.is_structural());
        assert!(RowType::PickerList.has_choices());
    }
}
