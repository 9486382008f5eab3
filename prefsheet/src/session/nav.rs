//! Editing sessions and the stack of nested sessions.
//!
//! Each session moves through
//! `Created → Active → (ChildActive → Active)* → Dismissing → Dismissed`.
//! Only the innermost session is `Active`; every session below it is
//! `ChildActive`, so a parent has at most one child at a time.

use std::fmt;

use serde::Serialize;

use crate::{
    data::{
        row::PropertyRow,
        schema::{RowPosition, Schema},
        store::{ValueMap, ValueStore},
    },
    error::NavigationError,
    session::delegate::SettingsDelegate,
};

/// Handle of a session. Never reused within one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a session. Only the innermost live session is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Built but not yet shown.
    Created,
    /// The innermost session; it takes edits.
    Active,
    /// A child session is open on top of this one.
    ChildActive,
    /// Its edits are being handed to the parent.
    Dismissing,
    /// Gone; nothing is accepted any more.
    Dismissed,
}

/// The single row a session is busy with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveRow {
    /// Row being edited, by storage key.
    Editing { key: String },
    /// Row a child session was opened from.
    Navigating {
        position: RowPosition,
        child: SessionId,
    },
}

/// Where a child session's edits go on dismissal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildOrigin {
    pub parent: SessionId,
    /// Nesting row in the parent the child was opened from.
    pub position: RowPosition,
    /// Parent key that receives the child's diff.
    pub merge_key: String,
}

/// One editing session: a schema, its value sets, and navigation state.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    title: String,
    schema: Schema,
    store: ValueStore,
    state: SessionState,
    active: Option<ActiveRow>,
    origin: Option<ChildOrigin>,
}

impl Session {
    fn new(id: SessionId, title: String, schema: Schema, store: ValueStore) -> Self {
        Self {
            id,
            title,
            schema,
            store,
            state: SessionState::Created,
            active: None,
            origin: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Root is level 0.
    pub fn level(&self) -> usize {
        self.schema.level()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Row being edited or navigated from, if any.
    pub fn active(&self) -> Option<&ActiveRow> {
        self.active.as_ref()
    }

    /// Storage key of the row being edited, if any.
    pub fn editing(&self) -> Option<&str> {
        match &self.active {
            Some(ActiveRow::Editing { key }) => Some(key),
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<&ChildOrigin> {
        self.origin.as_ref()
    }

    pub fn parent(&self) -> Option<SessionId> {
        self.origin.as_ref().map(|o| o.parent)
    }

    /// Edits made in this session so far.
    pub fn diff(&self) -> ValueMap {
        self.store.diff()
    }

    pub(crate) fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub(crate) fn store_mut(&mut self) -> &mut ValueStore {
        &mut self.store
    }

    pub(crate) fn set_editing(&mut self, key: Option<String>) {
        if let Some(ActiveRow::Editing { key: previous }) = &self.active {
            debug!("session {}: leaving edit of `{previous}`", self.id);
        }
        self.active = key.map(|key| ActiveRow::Editing { key });
    }
}

/// Outcome of dismissing a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Dismissal {
    /// A child's edits were stored in its parent under `key`.
    Merged {
        parent: SessionId,
        key: String,
        diff: ValueMap,
    },
    /// The root was dismissed; these are the session's output values.
    Finished(ValueMap),
}

/// Stack of live sessions, root first.
#[derive(Debug)]
pub struct NavigationStack {
    sessions: Vec<Session>,
    next_id: u64,
    max_nesting: usize,
}

impl NavigationStack {
    /// Install a root session over `schema` and `store`.
    pub fn new(title: impl Into<String>, schema: Schema, store: ValueStore, max_nesting: usize) -> Self {
        let mut root = Session::new(SessionId(0), title.into(), schema, store);
        root.state = SessionState::Active;
        Self {
            sessions: vec![root],
            next_id: 1,
            max_nesting,
        }
    }

    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn top(&self) -> Option<&Session> {
        self.sessions.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Session> {
        self.sessions.last_mut()
    }

    /// Most recently created id, reported for operations on an empty stack.
    pub(crate) fn last_id(&self) -> SessionId {
        SessionId(self.next_id.saturating_sub(1))
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// A live session, or [`NavigationError::Dismissed`].
    pub fn get(&self, id: SessionId) -> Result<&Session, NavigationError> {
        self.sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or(NavigationError::Dismissed { session: id })
    }

    fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, NavigationError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(NavigationError::Dismissed { session: id })
    }

    /// Open a child of `parent` for the row at `position`.
    ///
    /// Fails if `parent` already has an active child.
    pub fn push(
        &mut self,
        parent: SessionId,
        position: RowPosition,
        row: &PropertyRow,
        schema: Schema,
        store: ValueStore,
    ) -> Result<SessionId, NavigationError> {
        let max_nesting = self.max_nesting;
        let parent_session = self.get(parent)?;
        if parent_session.state == SessionState::ChildActive {
            return Err(NavigationError::ChildActive { session: parent });
        }
        if parent_session.level() + 1 > max_nesting {
            return Err(NavigationError::TooDeep { limit: max_nesting });
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;

        let mut child = Session::new(id, row.name.clone(), schema, store);
        child.origin = Some(ChildOrigin {
            parent,
            position,
            merge_key: row.merge_key().to_string(),
        });

        let parent_session = self.get_mut(parent)?;
        if parent_session.editing().is_some() {
            debug!("session {parent}: uncommitted edit discarded by navigation");
        }
        parent_session.state = SessionState::ChildActive;
        parent_session.active = Some(ActiveRow::Navigating { position, child: id });

        child.state = SessionState::Active;
        debug!(
            "push session {id} (level {}) from {parent} at {:?}",
            child.level(),
            position
        );
        self.sessions.push(child);
        Ok(id)
    }

    /// Dismiss `child`, merging its edits into its parent.
    ///
    /// The delegate is told before (`will_dismiss`) and after
    /// (`did_dismiss`) the merge. An uncommitted edit in `child` is dropped.
    pub fn pop<D: SettingsDelegate + ?Sized>(
        &mut self,
        child: SessionId,
        delegate: &mut D,
    ) -> Result<Dismissal, NavigationError> {
        let session = self.get(child)?;
        if session.state == SessionState::ChildActive {
            return Err(NavigationError::ChildActive { session: child });
        }
        if self.top().map(Session::id) != Some(child) {
            return Err(NavigationError::NotOnTop { session: child });
        }
        let Some(mut session) = self.sessions.pop() else {
            return Err(NavigationError::Dismissed { session: child });
        };

        session.state = SessionState::Dismissing;
        if let Some(key) = session.editing() {
            debug!("session {child}: uncommitted edit of `{key}` discarded");
        }
        session.active = None;
        delegate.will_dismiss(&session);

        let diff = session.diff();
        let dismissal = match session.origin.clone() {
            Some(origin) => {
                let parent = self.get_mut(origin.parent)?;
                parent.store.merge_child(&origin.merge_key, diff.clone());
                parent.state = SessionState::Active;
                parent.active = None;
                debug!(
                    "pop session {child} into {} under `{}` ({} values)",
                    origin.parent,
                    origin.merge_key,
                    diff.len()
                );
                Dismissal::Merged {
                    parent: origin.parent,
                    key: origin.merge_key,
                    diff,
                }
            }
            None => {
                debug!("pop root session {child} ({} values)", diff.len());
                Dismissal::Finished(diff)
            }
        };

        session.state = SessionState::Dismissed;
        delegate.did_dismiss(&session);
        Ok(dismissal)
    }
}
