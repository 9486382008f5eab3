//! The operations a presentation layer drives.
//!
//! A [`SessionController`] owns the navigation stack, the row type registry
//! and the host's delegate. Reads and writes address the innermost session;
//! [`push`](SessionController::push) and [`pop`](SessionController::pop)
//! take explicit session handles.

use serde::Serialize;
use serde_json::Value;

use crate::{
    config::SessionConfig,
    data::{
        group::PropertyGroup,
        registry::{RowContract, RowTypeRegistry},
        row::PropertyRow,
        schema::{RowPosition, Schema},
        store::{IndexedKey, ValueMap, ValueStore},
        types::{InteractionKind, KeyboardHint, RowType},
    },
    error::{CoercionError, NavigationError, Result, SettingsError},
    session::{
        delegate::{SchemaRefresh, SettingsDelegate},
        nav::{ActiveRow, Dismissal, NavigationStack, Session, SessionId, SessionState},
    },
};

/// What the presentation layer needs to render one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDescriptor {
    pub position: RowPosition,
    /// Display label.
    pub name: String,
    pub identifier: String,
    pub row_type: RowType,
    pub interaction: InteractionKind,
    /// Effective value. Nesting rows show the mapping stored under their
    /// merge key.
    pub value: Value,
    pub editable: bool,
    pub keyboard: KeyboardHint,
    /// Host flags, passed through unchanged.
    pub flags: String,
    /// The session holds an edit for this row.
    pub dirty: bool,
    /// The row is being edited or a child was opened from it.
    pub active: bool,
    /// Row height asked of the delegate, custom rows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// One group of a session, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDescriptor {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub rows: Vec<RowDescriptor>,
}

/// One entry of a generated choice list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceDescriptor {
    /// Pass to [`SessionController::select_choice`].
    pub index: usize,
    pub name: String,
    pub value: Value,
    /// The row's effective value is this choice.
    pub selected: bool,
}

/// Result of a successful [`SessionController::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// Storage key written.
    pub key: String,
    /// Coerced value now in effect.
    pub value: Value,
    /// False when the value was already in effect.
    pub changed: bool,
    /// The delegate altered the schema in response.
    pub schema_refreshed: bool,
}

/// Result of activating a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Edit started for this key.
    Editing(String),
    /// A child session was opened.
    Pushed(SessionId),
    /// The action fired.
    Fired,
    /// Pick one of these choices, then call `select_choice`.
    Choose(Vec<ChoiceDescriptor>),
    /// The activation committed a value directly.
    Committed(CommitOutcome),
    /// The delegate handled a custom row.
    Handled,
    /// Nothing to do.
    Inert,
}

/// Row declared for `key`, or the template row of an indexed key.
fn resolve_row<'a>(schema: &'a Schema, key: &str) -> Option<&'a PropertyRow> {
    schema.row_for(key).or_else(|| {
        let indexed = IndexedKey::decode(key)?;
        schema
            .row_for(indexed.name)
            .filter(|row| row.is_persisted())
    })
}

/// Interpreter of a settings schema for one editing run.
#[derive(Debug)]
pub struct SessionController<D: SettingsDelegate> {
    delegate: D,
    registry: RowTypeRegistry,
    config: SessionConfig,
    nav: NavigationStack,
}

impl<D: SettingsDelegate> SessionController<D> {
    /// Start a root session with the default configuration.
    pub fn new(groups: Vec<PropertyGroup>, delegate: D) -> Result<Self> {
        Self::with_config(groups, delegate, SessionConfig::default())
    }

    /// Start a root session. The schema is validated before the delegate
    /// is asked for values.
    pub fn with_config(
        groups: Vec<PropertyGroup>,
        mut delegate: D,
        config: SessionConfig,
    ) -> Result<Self> {
        let schema = Schema::build(groups, 0)?;
        let store = ValueStore::new(delegate.initial_values(), delegate.default_values());
        info!(
            "settings session started: {} groups, {} input values",
            schema.groups().len(),
            store.values_in().len()
        );
        let title = schema
            .groups()
            .first()
            .map(|g| g.title.clone())
            .unwrap_or_default();
        Ok(Self {
            delegate,
            registry: RowTypeRegistry::new(),
            nav: NavigationStack::new(title, schema, store, config.max_nesting),
            config,
        })
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_delegate(self) -> D {
        self.delegate
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &RowTypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RowTypeRegistry {
        &mut self.registry
    }

    pub fn navigation(&self) -> &NavigationStack {
        &self.nav
    }

    /// All sessions were dismissed.
    pub fn is_finished(&self) -> bool {
        self.nav.is_empty()
    }

    /// Number of live sessions.
    pub fn depth(&self) -> usize {
        self.nav.depth()
    }

    /// The innermost session.
    pub fn current(&self) -> Result<&Session> {
        self.nav.top().ok_or_else(|| self.finished_error())
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.nav.top().map(Session::id)
    }

    pub fn session(&self, id: SessionId) -> Result<&Session> {
        Ok(self.nav.get(id)?)
    }

    fn finished_error(&self) -> SettingsError {
        NavigationError::Dismissed {
            session: self.nav.last_id(),
        }
        .into()
    }

    fn current_mut(&mut self) -> Result<&mut Session> {
        let err = self.finished_error();
        self.nav.top_mut().ok_or(err)
    }

    pub fn row_at(&self, group: usize, row: usize) -> Option<&PropertyRow> {
        self.nav.top()?.schema().row_at(group, row)
    }

    /// Row for an identifier or indexed key, `None` when unknown.
    pub fn row_for(&self, key: &str) -> Option<&PropertyRow> {
        resolve_row(self.nav.top()?.schema(), key)
    }

    pub fn position_of(&self, identifier: &str) -> Option<RowPosition> {
        self.nav.top()?.schema().position_of(identifier)
    }

    /// Effective value of `key`, falling back to the declared value of the
    /// row. `None` when neither a value set nor a row knows the key.
    pub fn effective_value(&self, key: &str) -> Option<Value> {
        let session = self.nav.top()?;
        let store = session.store();
        match resolve_row(session.schema(), key) {
            Some(row) if row.identifier == key => {
                Some(store.effective_value(key, &row.declared_value()))
            }
            _ => store.get(key).cloned(),
        }
    }

    /// `(index, value)` pairs of the indexed keys of `name`.
    pub fn indexed_values(&self, name: &str) -> Vec<(usize, Value)> {
        self.nav
            .top()
            .map(|s| s.store().indexed(name))
            .unwrap_or_default()
    }

    /// Edits accumulated by the innermost session.
    pub fn diff(&self) -> Result<ValueMap> {
        Ok(self.current()?.diff())
    }

    /// Contract of a row; `custom` rows may get theirs from the delegate.
    pub fn contract_for(&self, row: &PropertyRow) -> RowContract {
        let row_type = row.row_type();
        if row_type == RowType::Custom
            && let Some(contract) = self.delegate.custom_contract(row)
        {
            return contract;
        }
        self.registry.contract_for(row_type)
    }

    fn describe(&self, session: &Session, pos: RowPosition, row: &PropertyRow) -> RowDescriptor {
        let contract = self.contract_for(row);
        let store = session.store();
        let active = match session.active() {
            Some(ActiveRow::Editing { key }) => *key == row.identifier,
            Some(ActiveRow::Navigating { position, .. }) => *position == pos,
            None => false,
        };
        let height = if row.row_type() == RowType::Custom {
            self.delegate.custom_row_height(row)
        } else {
            None
        };
        // Nesting rows hold their child's edits under the merge key.
        let key = if row.row_type().is_nesting() {
            row.merge_key()
        } else {
            row.identifier.as_str()
        };
        RowDescriptor {
            position: pos,
            name: row.name.clone(),
            identifier: row.identifier.clone(),
            row_type: row.row_type(),
            interaction: contract.interaction,
            value: store.effective_value(key, &row.declared_value()),
            editable: row.editable,
            keyboard: row.keyboard,
            flags: row.flags.clone(),
            dirty: !key.is_empty() && store.is_dirty(key),
            active,
            height,
        }
    }

    /// Descriptor of one row of the innermost session.
    pub fn descriptor(&self, pos: RowPosition) -> Result<RowDescriptor> {
        let session = self.current()?;
        let row = session
            .schema()
            .row_at_position(pos)
            .ok_or(SettingsError::UnknownPosition {
                group: pos.group,
                row: pos.row,
            })?;
        Ok(self.describe(session, pos, row))
    }

    /// Descriptors of every section of the innermost session.
    pub fn sections(&self) -> Result<Vec<SectionDescriptor>> {
        let session = self.current()?;
        Ok(session
            .schema()
            .groups()
            .iter()
            .enumerate()
            .map(|(g, group)| SectionDescriptor {
                title: group.title.clone(),
                key: group.key.clone(),
                header: group.header.clone(),
                footer: group.footer.clone(),
                rows: group
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(r, row)| self.describe(session, RowPosition::new(g, r), row))
                    .collect(),
            })
            .collect())
    }

    /// Choice list of a `multiValue`/`pickerList`/`pickerView` row.
    pub fn choices(&self, identifier: &str) -> Option<Vec<ChoiceDescriptor>> {
        let session = self.nav.top()?;
        let row = resolve_row(session.schema(), identifier)?;
        let choices = row.kind.choices();
        if choices.is_empty() {
            return None;
        }
        let current = session
            .store()
            .effective_value(identifier, &row.declared_value());
        Some(
            choices
                .iter()
                .enumerate()
                .map(|(index, c)| ChoiceDescriptor {
                    index,
                    name: c.name.clone(),
                    value: c.value.clone(),
                    selected: c.value == current,
                })
                .collect(),
        )
    }

    /// Writable row for `key`, with its identifier set to `key` for
    /// indexed keys.
    fn writable_row(&self, key: &str) -> Result<(PropertyRow, RowContract)> {
        let session = self.current()?;
        let mut row = resolve_row(session.schema(), key)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownRow {
                identifier: key.to_string(),
            })?;
        if !row.editable {
            return Err(SettingsError::ReadOnly {
                identifier: key.to_string(),
            });
        }
        let contract = self.contract_for(&row);
        if !contract.persisted {
            return Err(CoercionError::NotPersisted {
                identifier: key.to_string(),
            }
            .into());
        }
        row.identifier = key.to_string();
        Ok((row, contract))
    }

    /// Write `raw` to `key` in the innermost session.
    ///
    /// The value is coerced to the row's type; on failure nothing changes.
    /// A change is reported to the delegate, then the delegate may refresh
    /// the schema. A rejected refresh returns its error, the written value
    /// stays.
    pub fn commit(&mut self, key: &str, raw: Value) -> Result<CommitOutcome> {
        let (row, contract) = self.writable_row(key)?;
        let lenient = self.config.lenient_strings;
        let session = self.current_mut()?;
        let committed = match session
            .store_mut()
            .commit(key, &row, &contract, raw, lenient)
        {
            Ok(committed) => committed,
            Err(e) => {
                warn!("commit rejected: {e}");
                return Err(e.into());
            }
        };
        debug!(
            "session {}: commit `{key}` = {} ({})",
            session.id(),
            committed.value,
            if committed.changed { "changed" } else { "unchanged" }
        );

        let mut outcome = CommitOutcome {
            key: key.to_string(),
            value: committed.value,
            changed: committed.changed,
            schema_refreshed: false,
        };
        if outcome.changed || self.config.notify_unchanged {
            self.delegate.on_row_changed(&outcome.value, &row);
            outcome.schema_refreshed = self.refresh_schema(&row)?;
        }
        Ok(outcome)
    }

    fn refresh_schema(&mut self, changed: &PropertyRow) -> Result<bool> {
        let Some(session) = self.nav.top_mut() else {
            return Ok(false);
        };
        let refresh = self
            .delegate
            .refresh_schema(session.schema().groups(), changed);
        let applied = match refresh {
            SchemaRefresh::Unchanged => return Ok(false),
            SchemaRefresh::Groups(groups) => session.schema_mut().replace_groups(groups),
            SchemaRefresh::Rows { group, rows } => session.schema_mut().replace_rows(&group, rows),
        };
        if let Err(e) = applied {
            warn!("schema refresh rejected, keeping previous schema: {e}");
            return Err(e.into());
        }
        let stale = session
            .editing()
            .is_some_and(|key| resolve_row(session.schema(), key).is_none());
        if stale {
            session.set_editing(None);
        }
        debug!("session {}: schema refreshed", session.id());
        Ok(true)
    }

    /// Mark `key` as the row being edited, replacing any previous edit.
    pub fn begin_edit(&mut self, key: &str) -> Result<()> {
        self.writable_row(key)?;
        self.current_mut()?.set_editing(Some(key.to_string()));
        Ok(())
    }

    /// Drop the edit in progress without writing anything.
    pub fn cancel_edit(&mut self) -> Result<()> {
        self.current_mut()?.set_editing(None);
        Ok(())
    }

    /// Storage key of the row being edited in the innermost session.
    pub fn editing(&self) -> Option<&str> {
        self.nav.top()?.editing()
    }

    /// Commit `raw` to the row being edited and end the edit. A rejected
    /// value keeps the edit open.
    pub fn commit_edit(&mut self, raw: Value) -> Result<CommitOutcome> {
        let key = self
            .editing()
            .map(str::to_string)
            .ok_or(NavigationError::NoActiveEdit)?;
        let outcome = self.commit(&key, raw)?;
        if self.editing() == Some(key.as_str()) {
            self.current_mut()?.set_editing(None);
        }
        Ok(outcome)
    }

    /// Commit the value of the `index`th choice of a selection row.
    pub fn select_choice(&mut self, identifier: &str, index: usize) -> Result<CommitOutcome> {
        let value = self
            .row_for(identifier)
            .and_then(|row| row.kind.choices().get(index))
            .map(|c| c.value.clone())
            .ok_or_else(|| CoercionError::NotAChoice {
                identifier: identifier.to_string(),
                actual: format!("choice #{index}"),
            })?;
        self.commit(identifier, value)
    }

    /// Activate the row at `pos` of the innermost session, dispatching on
    /// its contract.
    pub fn activate(&mut self, pos: RowPosition) -> Result<Activation> {
        let session = self.current()?;
        let id = session.id();
        let row = session
            .schema()
            .row_at_position(pos)
            .cloned()
            .ok_or(SettingsError::UnknownPosition {
                group: pos.group,
                row: pos.row,
            })?;
        let contract = self.contract_for(&row);

        if contract.recurses {
            return Ok(Activation::Pushed(self.push(id, pos)?));
        }
        Ok(match contract.interaction {
            InteractionKind::Trigger => {
                debug!("session {id}: action `{}`", row.name);
                self.delegate.on_action(&row);
                Activation::Fired
            }
            InteractionKind::Custom => {
                if self.delegate.custom_select(&row) {
                    Activation::Handled
                } else {
                    Activation::Inert
                }
            }
            _ if !row.editable || row.identifier.is_empty() => Activation::Inert,
            InteractionKind::Display => Activation::Inert,
            InteractionKind::Selection if row.row_type() == RowType::Choice => {
                Activation::Committed(self.commit(&row.identifier, row.declared_value())?)
            }
            InteractionKind::Selection => {
                Activation::Choose(self.choices(&row.identifier).unwrap_or_default())
            }
            InteractionKind::Toggle => {
                let current = self
                    .effective_value(&row.identifier)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                Activation::Committed(self.commit(&row.identifier, Value::Bool(!current))?)
            }
            _ => {
                self.begin_edit(&row.identifier)?;
                Activation::Editing(row.identifier)
            }
        })
    }

    /// Open a child session of `parent` for the nesting row at `pos`.
    ///
    /// The child schema comes from the row or, failing that, from the
    /// delegate. Fails while `parent` already has an active child.
    pub fn push(&mut self, parent: SessionId, pos: RowPosition) -> Result<SessionId> {
        let parent_session = self.nav.get(parent)?;
        if parent_session.state() == SessionState::ChildActive {
            return Err(NavigationError::ChildActive { session: parent }.into());
        }
        let row = parent_session
            .schema()
            .row_at_position(pos)
            .cloned()
            .ok_or(SettingsError::UnknownPosition {
                group: pos.group,
                row: pos.row,
            })?;
        if !self.contract_for(&row).recurses {
            return Err(NavigationError::NotNavigable {
                identifier: row.merge_key().to_string(),
            }
            .into());
        }

        let merge_key = row.merge_key().to_string();
        let level = parent_session.level() + 1;
        let nested_in = parent_session.store().nested_effective(&merge_key).cloned();
        let nested_default = parent_session.store().nested_default(&merge_key).cloned();

        let groups = match row.kind.child_groups() {
            Some(groups) => groups,
            None => self
                .delegate
                .rows_for_child(&row)
                .ok_or_else(|| NavigationError::NoChildSchema {
                    identifier: merge_key.clone(),
                })?,
        };
        let schema = Schema::build(groups, level)?;
        let values_in = self
            .delegate
            .child_values(&row)
            .or(nested_in)
            .unwrap_or_default();
        let store = ValueStore::new(values_in, nested_default.unwrap_or_default());

        Ok(self.nav.push(parent, pos, &row, schema, store)?)
    }

    /// Dismiss `child`, merging its edits into its parent, or finishing
    /// the run when `child` is the root.
    pub fn pop(&mut self, child: SessionId) -> Result<Dismissal> {
        let dismissal = self.nav.pop(child, &mut self.delegate)?;
        if let Dismissal::Finished(values) = &dismissal {
            info!("settings session finished: {} values changed", values.len());
        }
        Ok(dismissal)
    }

    /// Dismiss the innermost session.
    pub fn dismiss(&mut self) -> Result<Dismissal> {
        let id = self.current()?.id();
        self.pop(id)
    }

    /// Dismiss every session, innermost first, and return the root's
    /// output values.
    pub fn finish(&mut self) -> Result<ValueMap> {
        loop {
            if let Dismissal::Finished(values) = self.dismiss()? {
                return Ok(values);
            }
        }
    }

    fn row_at_pos(&self, pos: RowPosition) -> Result<PropertyRow> {
        self.current()?
            .schema()
            .row_at_position(pos)
            .cloned()
            .ok_or(SettingsError::UnknownPosition {
                group: pos.group,
                row: pos.row,
            })
    }

    /// Ask the delegate to delete the row at `pos`. Returns whether it did.
    pub fn delete_row(&mut self, pos: RowPosition) -> Result<bool> {
        let row = self.row_at_pos(pos)?;
        Ok(self.delegate.commit_delete(&row))
    }

    /// Report that the row at `pos` was laid out.
    pub fn did_layout(&mut self, pos: RowPosition) -> Result<()> {
        let row = self.row_at_pos(pos)?;
        self.delegate.did_layout(&row);
        Ok(())
    }

    /// Report a touch on the row at `pos`.
    pub fn touch(&mut self, pos: RowPosition) -> Result<()> {
        let row = self.row_at_pos(pos)?;
        self.delegate.touched(&row);
        Ok(())
    }
}
