//! The host side of a settings session.
//!
//! [`SettingsDelegate::initial_values`] is the only method a host has to
//! implement. Every other hook has a no-op default, so the session calls
//! them unconditionally.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{
    data::{group::PropertyGroup, registry::RowContract, row::PropertyRow, store::ValueMap},
    session::nav::Session,
};

/// What the host wants done with the schema after an edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SchemaRefresh {
    #[default]
    Unchanged,
    /// Replace every group of the current session.
    Groups(Vec<PropertyGroup>),
    /// Replace the rows of the group keyed `group`.
    Rows {
        group: String,
        rows: Vec<PropertyRow>,
    },
}

/// Host callbacks driven by a [`SessionController`](crate::SessionController).
#[allow(unused_variables)]
pub trait SettingsDelegate {
    /// Input values of the root session.
    fn initial_values(&mut self) -> ValueMap;

    /// Fallback values of the root session.
    fn default_values(&mut self) -> ValueMap {
        ValueMap::new()
    }

    /// Child schema for a nesting row that declares none.
    fn rows_for_child(&mut self, row: &PropertyRow) -> Option<Vec<PropertyGroup>> {
        None
    }

    /// Input values for a child session. When `None`, the parent's nested
    /// value under the row's merge key is used.
    fn child_values(&mut self, row: &PropertyRow) -> Option<ValueMap> {
        None
    }

    /// Fired after every commit that changed a value.
    fn on_row_changed(&mut self, value: &Value, row: &PropertyRow) {}

    /// Called right after [`on_row_changed`](Self::on_row_changed) with the
    /// current session's groups.
    fn refresh_schema(&mut self, groups: &[PropertyGroup], changed: &PropertyRow) -> SchemaRefresh {
        SchemaRefresh::Unchanged
    }

    fn will_dismiss(&mut self, session: &Session) {}

    fn did_dismiss(&mut self, session: &Session) {}

    /// An `action` row was activated.
    fn on_action(&mut self, row: &PropertyRow) {}

    /// Replacement contract for a `custom` row.
    fn custom_contract(&self, row: &PropertyRow) -> Option<RowContract> {
        None
    }

    /// Height of a `custom` row, in presentation units.
    fn custom_row_height(&self, row: &PropertyRow) -> Option<f64> {
        None
    }

    /// A `custom` row was selected. Return `true` when handled.
    fn custom_select(&mut self, row: &PropertyRow) -> bool {
        false
    }

    /// The user asked to delete a row. Return `true` when handled.
    fn commit_delete(&mut self, row: &PropertyRow) -> bool {
        false
    }

    /// The presentation layer laid out a row.
    fn did_layout(&mut self, row: &PropertyRow) {}

    /// The user touched a row without activating it.
    fn touched(&mut self, row: &PropertyRow) {}
}

/// Callback run when an `action` row fires.
pub type ActionCallback = Arc<dyn Fn(&PropertyRow) + Send + Sync>;

/// Hook registration for the action row with a given identifier.
#[derive(Clone)]
pub struct ActionHook {
    pub identifier: String,
    pub callback: ActionCallback,
}

impl ActionHook {
    pub fn new(identifier: impl Into<String>, callback: impl Fn(&PropertyRow) + Send + Sync + 'static) -> Self {
        Self {
            identifier: identifier.into(),
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for ActionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHook")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// A delegate backed by fixed value maps.
///
/// Child schemas for lazy nesting rows are looked up by merge key, action
/// rows run the matching [`ActionHook`]s, and every change is recorded.
#[derive(Debug, Clone, Default)]
pub struct StaticDelegate {
    pub values_in: ValueMap,
    pub defaults: ValueMap,
    /// Child schemas by merge key.
    pub children: HashMap<String, Vec<PropertyGroup>>,
    pub action_hooks: Vec<ActionHook>,
    /// `(identifier, value)` of every change notification, in order.
    pub changes: Vec<(String, Value)>,
}

impl StaticDelegate {
    pub fn new(values_in: ValueMap) -> Self {
        Self {
            values_in,
            ..Default::default()
        }
    }

    pub fn with_defaults(mut self, defaults: ValueMap) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_child(mut self, merge_key: impl Into<String>, groups: Vec<PropertyGroup>) -> Self {
        self.children.insert(merge_key.into(), groups);
        self
    }

    pub fn with_action_hook(mut self, hook: ActionHook) -> Self {
        self.action_hooks.push(hook);
        self
    }
}

impl SettingsDelegate for StaticDelegate {
    fn initial_values(&mut self) -> ValueMap {
        self.values_in.clone()
    }

    fn default_values(&mut self) -> ValueMap {
        self.defaults.clone()
    }

    fn rows_for_child(&mut self, row: &PropertyRow) -> Option<Vec<PropertyGroup>> {
        self.children.get(row.merge_key()).cloned()
    }

    fn on_row_changed(&mut self, value: &Value, row: &PropertyRow) {
        self.changes.push((row.identifier.clone(), value.clone()));
    }

    fn on_action(&mut self, row: &PropertyRow) {
        for hook in self.action_hooks.iter().filter(|h| h.identifier == row.identifier) {
            (hook.callback)(row);
        }
    }
}
