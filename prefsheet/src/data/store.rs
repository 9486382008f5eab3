//! Layered value sets of one session.
//!
//! Lookups resolve `values_out`, then `values_in`, then `values_default`,
//! then the row's declared value. Only `values_out` is written to.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    data::{registry::RowContract, row::PropertyRow},
    error::CoercionError,
};

/// Identifier → value mapping used for all three value sets.
pub type ValueMap = Map<String, Value>;

/// Which value set answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Committed during this session.
    Output,
    /// Supplied by the host when the session began.
    Input,
    /// Host fallback values.
    Default,
}

/// Result of a successful [`ValueStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    /// The coerced value now in effect.
    pub value: Value,
    /// False when the value equalled the effective one and nothing was written.
    pub changed: bool,
}

/// The three value sets of one session. Only commits write, and only to
/// `values_out`.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values_in: ValueMap,
    values_default: ValueMap,
    values_out: ValueMap,
}

impl ValueStore {
    /// A store with nothing committed yet.
    pub fn new(values_in: ValueMap, values_default: ValueMap) -> Self {
        Self {
            values_in,
            values_default,
            values_out: ValueMap::new(),
        }
    }

    pub fn values_in(&self) -> &ValueMap {
        &self.values_in
    }

    pub fn values_default(&self) -> &ValueMap {
        &self.values_default
    }

    pub fn values_out(&self) -> &ValueMap {
        &self.values_out
    }

    /// First value set holding `key`, in the order out, in, default.
    pub fn lookup(&self, key: &str) -> Option<(&Value, ValueSource)> {
        self.values_out
            .get(key)
            .map(|v| (v, ValueSource::Output))
            .or_else(|| self.values_in.get(key).map(|v| (v, ValueSource::Input)))
            .or_else(|| {
                self.values_default
                    .get(key)
                    .map(|v| (v, ValueSource::Default))
            })
    }

    /// Value from the three sets, without the declared fallback.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.lookup(key).map(|(v, _)| v)
    }

    /// Value from the three sets, else `declared`.
    pub fn effective_value(&self, key: &str, declared: &Value) -> Value {
        self.get(key).unwrap_or(declared).clone()
    }

    /// True once `key` was committed in this session.
    pub fn is_dirty(&self, key: &str) -> bool {
        self.values_out.contains_key(key)
    }

    /// Coerce `raw` through `contract` and write it under `key`.
    ///
    /// Writing the value already in effect leaves `values_out` unchanged.
    /// A coercion failure leaves the store unchanged.
    pub fn commit(
        &mut self,
        key: &str,
        row: &PropertyRow,
        contract: &RowContract,
        raw: Value,
        lenient: bool,
    ) -> Result<Committed, CoercionError> {
        let value = contract.coerce(key, row, raw, lenient)?;
        let current = self.effective_value(key, &row.declared_value());
        let same = current == value
            || contract
                .coerce(key, row, current, true)
                .is_ok_and(|c| c == value);
        if same {
            return Ok(Committed {
                value,
                changed: false,
            });
        }
        self.values_out.insert(key.to_string(), value.clone());
        Ok(Committed {
            value,
            changed: true,
        })
    }

    /// Accumulated edits of this session.
    pub fn diff(&self) -> ValueMap {
        self.values_out.clone()
    }

    pub fn into_diff(self) -> ValueMap {
        self.values_out
    }

    /// Store a child session's edits as a nested mapping under `key`,
    /// replacing any earlier nested value. An empty diff changes nothing.
    pub fn merge_child(&mut self, key: &str, child_diff: ValueMap) {
        if child_diff.is_empty() {
            return;
        }
        self.values_out
            .insert(key.to_string(), Value::Object(child_diff));
    }

    /// Effective nested mapping under `key`, if the value is a mapping.
    pub fn nested_effective(&self, key: &str) -> Option<&ValueMap> {
        self.get(key).and_then(Value::as_object)
    }

    /// Nested mapping stored under `key` in the default set, if any.
    pub fn nested_default(&self, key: &str) -> Option<&ValueMap> {
        self.values_default.get(key).and_then(Value::as_object)
    }

    /// `(index, value)` pairs of indexed keys `name0`, `name1`, ... across
    /// all three sets, in ascending index order.
    pub fn indexed(&self, name: &str) -> Vec<(usize, Value)> {
        let mut found = BTreeMap::new();
        for key in self
            .values_default
            .keys()
            .chain(self.values_in.keys())
            .chain(self.values_out.keys())
        {
            if let Some(k) = IndexedKey::decode(key)
                && k.name == name
                && let Some(v) = self.get(key)
            {
                found.insert(k.index, v.clone());
            }
        }
        found.into_iter().collect()
    }

    /// One past the highest index in use for `name`, `None` once the
    /// highest index is `usize::MAX`.
    pub fn next_index(&self, name: &str) -> Option<usize> {
        match self.indexed(name).last() {
            Some((i, _)) => i.checked_add(1),
            None => Some(0),
        }
    }
}

/// A row identifier parameterized by a non-negative index: `phone` + `2`
/// is stored as `phone2`.
///
/// Names must be non-empty and must not end in an ASCII digit, otherwise
/// the split back into name and index would be ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedKey<'a> {
    /// Row identifier without the trailing number.
    pub name: &'a str,
    pub index: usize,
}

impl<'a> IndexedKey<'a> {
    pub fn new(name: &'a str, index: usize) -> Option<Self> {
        is_indexable_name(name).then_some(Self { name, index })
    }

    pub fn encode(&self) -> String {
        format!("{}{}", self.name, self.index)
    }

    /// Inverse of [`encode`](Self::encode). Rejects keys without a trailing
    /// number and numbers with leading zeros.
    pub fn decode(key: &'a str) -> Option<Self> {
        let digits = key.len() - key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (name, number) = key.split_at(key.len() - digits);
        if number.is_empty() || name.is_empty() {
            return None;
        }
        if number.len() > 1 && number.starts_with('0') {
            return None;
        }
        Some(Self {
            name,
            index: number.parse().ok()?,
        })
    }
}

pub fn is_indexable_name(name: &str) -> bool {
    name.chars().last().is_some_and(|c| !c.is_ascii_digit())
}

/// `name ++ decimal(index)`, or `None` for a name that cannot be indexed.
pub fn encode_indexed(name: &str, index: usize) -> Option<String> {
    IndexedKey::new(name, index).map(|k| k.encode())
}

pub fn decode_indexed(key: &str) -> Option<(&str, usize)> {
    IndexedKey::decode(key).map(|k| (k.name, k.index))
}
