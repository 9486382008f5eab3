//! Error types for schema construction, value coercion and navigation.
//!
//! Lookups of unknown identifiers are not errors: queries such as
//! [`Schema::row_for`](crate::data::schema::Schema::row_for) return `None`.

use thiserror::Error;

use crate::session::nav::SessionId;

/// A malformed schema. Fatal to schema construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A group or row lacks a field the wire format requires.
    #[error("{path}: missing required field `{field}`")]
    MissingField {
        /// Location of the offending group or row.
        path: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field is present but its content does not fit the row.
    #[error("{path}: invalid `{field}`: {reason}")]
    InvalidField {
        path: String,
        field: &'static str,
        reason: String,
    },
    /// The row `type` names no known row type.
    #[error("{path}: unknown row type {found}")]
    UnknownRowType { path: String, found: String },
    /// Two rows at one nesting level share an identifier.
    #[error("duplicate identifier `{identifier}` at nesting level {level} ({first} and {second})")]
    DuplicateIdentifier {
        identifier: String,
        level: usize,
        first: String,
        second: String,
    },
    /// A choice set declares no entries.
    #[error("{path}: choice set has no entries")]
    EmptyChoiceSet { path: String },
    /// No group carries the requested key.
    #[error("no group with key `{key}`")]
    UnknownGroup { key: String },
    /// A sequence was expected.
    #[error("{path}: expected a list")]
    NotAList { path: String },
}

/// A committed value could not be converted to the row's declared type.
///
/// The commit is rejected and the previous effective value is retained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    /// The value's representation does not convert to the row type.
    #[error("`{identifier}` expects {expected}, got {actual}")]
    TypeMismatch {
        identifier: String,
        expected: String,
        actual: String,
    },
    /// The value is not one of the row's choices.
    #[error("`{identifier}` has no choice matching {actual}")]
    NotAChoice { identifier: String, actual: String },
    /// The row does not hold a value of its own.
    #[error("`{identifier}` does not hold a value")]
    NotPersisted { identifier: String },
    /// A host-supplied coercion refused the value.
    #[error("`{identifier}` rejected the value: {reason}")]
    Rejected { identifier: String, reason: String },
}

/// Misuse of the navigation stack.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The session already has an active child.
    #[error("session {session} already has an active child")]
    ChildActive { session: SessionId },
    /// The session was dismissed or never existed.
    #[error("session {session} has been dismissed")]
    Dismissed { session: SessionId },
    /// The session is live but not the innermost one.
    #[error("session {session} is not the innermost session")]
    NotOnTop { session: SessionId },
    /// The row does not recurse into a child schema.
    #[error("row `{identifier}` does not open a child schema")]
    NotNavigable { identifier: String },
    /// Neither the row nor the delegate provides child rows.
    #[error("no child schema available for `{identifier}`")]
    NoChildSchema { identifier: String },
    /// The nesting limit would be exceeded.
    #[error("nesting limit of {limit} reached")]
    TooDeep { limit: usize },
    /// `commit_edit` without a preceding `begin_edit`.
    #[error("no row is being edited")]
    NoActiveEdit,
}

/// Any failure reported by a [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    /// A write addressed an identifier no row declares.
    #[error("no row with identifier `{identifier}`")]
    UnknownRow { identifier: String },
    /// A position outside the current schema.
    #[error("no row at group {group}, row {row}")]
    UnknownPosition { group: usize, row: usize },
    /// A write addressed a row declared non-editable.
    #[error("row `{identifier}` is not editable")]
    ReadOnly { identifier: String },
}

/// Result alias used across the crate.
pub type Result<T, E = SettingsError> = std::result::Result<T, E>;
