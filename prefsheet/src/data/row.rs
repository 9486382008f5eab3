use serde_json::{Number, Value};

use crate::data::{
    group::PropertyGroup,
    types::{KeyboardHint, RowType},
};

/// One entry of a choice set: a display name and the value it commits.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// Label shown in the choice list.
    pub name: String,
    /// Stored when this entry is picked.
    pub value: Value,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Type-specific payload of a row, keyed by its [`RowType`].
///
/// Leaf variants carry the declared fallback value, already checked against
/// the type. Nesting variants carry an optional eager child schema; `None`
/// means the delegate supplies it at navigation time.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Default { value: Value },
    String { value: String },
    Integer { value: Option<i64> },
    Decimal { value: Option<f64> },
    Boolean { value: bool },
    /// Date as `YYYY-MM-DD` or RFC 3339.
    Date { value: Option<String> },
    MultilineText { value: String },
    RichText { html: String },
    SimpleList { items: Vec<Value> },
    Custom { value: Value },
    Choice { value: Value },
    MultiLevel { groups: Option<Vec<PropertyGroup>> },
    MultiValue { choices: Vec<Choice> },
    PickerList { choices: Vec<Choice> },
    PickerView { choices: Vec<Choice> },
    PropertyList { group: Option<Box<PropertyGroup>> },
    Action,
}

impl RowKind {
    pub fn row_type(&self) -> RowType {
        match self {
            RowKind::Default { .. } => RowType::Default,
            RowKind::String { .. } => RowType::String,
            RowKind::Integer { .. } => RowType::Integer,
            RowKind::Decimal { .. } => RowType::Decimal,
            RowKind::Boolean { .. } => RowType::Boolean,
            RowKind::Date { .. } => RowType::Date,
            RowKind::MultilineText { .. } => RowType::MultilineText,
            RowKind::RichText { .. } => RowType::RichText,
            RowKind::SimpleList { .. } => RowType::SimpleList,
            RowKind::Custom { .. } => RowType::Custom,
            RowKind::Choice { .. } => RowType::Choice,
            RowKind::MultiLevel { .. } => RowType::MultiLevel,
            RowKind::MultiValue { .. } => RowType::MultiValue,
            RowKind::PickerList { .. } => RowType::PickerList,
            RowKind::PickerView { .. } => RowType::PickerView,
            RowKind::PropertyList { .. } => RowType::PropertyList,
            RowKind::Action => RowType::Action,
        }
    }

    /// The value a row falls back to when no value set has an entry.
    pub fn declared_value(&self) -> Value {
        match self {
            RowKind::Default { value } | RowKind::Custom { value } | RowKind::Choice { value } => {
                value.clone()
            }
            RowKind::String { value } | RowKind::MultilineText { value } => {
                Value::String(value.clone())
            }
            RowKind::RichText { html } => Value::String(html.clone()),
            RowKind::Integer { value } => value.map_or(Value::Null, Value::from),
            RowKind::Decimal { value } => value
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number),
            RowKind::Boolean { value } => Value::Bool(*value),
            RowKind::Date { value } => value.clone().map_or(Value::Null, Value::String),
            RowKind::SimpleList { items } => Value::Array(items.clone()),
            RowKind::MultiLevel { .. }
            | RowKind::MultiValue { .. }
            | RowKind::PickerList { .. }
            | RowKind::PickerView { .. }
            | RowKind::PropertyList { .. }
            | RowKind::Action => Value::Null,
        }
    }

    /// Choice set of selection rows, empty for every other kind.
    pub fn choices(&self) -> &[Choice] {
        match self {
            RowKind::MultiValue { choices }
            | RowKind::PickerList { choices }
            | RowKind::PickerView { choices } => choices,
            _ => &[],
        }
    }

    /// Eagerly declared child schema of a nesting row.
    pub fn child_groups(&self) -> Option<Vec<PropertyGroup>> {
        match self {
            RowKind::MultiLevel { groups } => groups.clone(),
            RowKind::PropertyList { group } => group.as_deref().map(|g| vec![g.clone()]),
            _ => None,
        }
    }
}

/// One editable or actionable entry of a [`PropertyGroup`].
///
/// `name` is the display label; `identifier` is the storage key in the
/// value sets. The two are independent.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRow {
    pub name: String,
    pub identifier: String,
    pub kind: RowKind,
    pub editable: bool,
    pub keyboard: KeyboardHint,
    pub flags: String,
}

impl PropertyRow {
    /// An editable row with default keyboard and no flags.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>, kind: RowKind) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            kind,
            editable: true,
            keyboard: KeyboardHint::Default,
            flags: String::new(),
        }
    }

    pub fn string(name: impl Into<String>, identifier: impl Into<String>, value: &str) -> Self {
        Self::new(
            name,
            identifier,
            RowKind::String {
                value: value.to_string(),
            },
        )
    }

    pub fn integer(name: impl Into<String>, identifier: impl Into<String>, value: i64) -> Self {
        Self::new(name, identifier, RowKind::Integer { value: Some(value) })
            .with_keyboard(KeyboardHint::NumberPad)
    }

    pub fn boolean(name: impl Into<String>, identifier: impl Into<String>, value: bool) -> Self {
        Self::new(name, identifier, RowKind::Boolean { value })
    }

    pub fn multi_value(
        name: impl Into<String>,
        identifier: impl Into<String>,
        choices: Vec<Choice>,
    ) -> Self {
        Self::new(name, identifier, RowKind::MultiValue { choices })
    }

    /// A nesting row; `groups = None` defers the child schema to the delegate.
    pub fn multi_level(
        name: impl Into<String>,
        identifier: impl Into<String>,
        groups: Option<Vec<PropertyGroup>>,
    ) -> Self {
        Self::new(name, identifier, RowKind::MultiLevel { groups })
    }

    pub fn property_list(
        name: impl Into<String>,
        identifier: impl Into<String>,
        group: Option<PropertyGroup>,
    ) -> Self {
        Self::new(
            name,
            identifier,
            RowKind::PropertyList {
                group: group.map(Box::new),
            },
        )
    }

    pub fn action(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(name, identifier, RowKind::Action)
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_keyboard(mut self, keyboard: KeyboardHint) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn row_type(&self) -> RowType {
        self.kind.row_type()
    }

    pub fn declared_value(&self) -> Value {
        self.kind.declared_value()
    }

    /// Whether the row stores a value of its own under `identifier`.
    pub fn is_persisted(&self) -> bool {
        !self.row_type().is_structural()
    }

    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    /// Key under which a child session's edits are stored in the parent.
    ///
    /// The identifier when set, else the nested section's `key`, else the
    /// display name.
    pub fn merge_key(&self) -> &str {
        if !self.identifier.is_empty() {
            return &self.identifier;
        }
        if let RowKind::PropertyList { group: Some(group) } = &self.kind
            && let Some(key) = group.key.as_deref()
            && !key.is_empty()
        {
            return key;
        }
        &self.name
    }
}
