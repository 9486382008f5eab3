//! Schema model and value storage.
//!
//! - [`types`] - Row type tags and keyboard hints
//! - [`row`] - Rows and their type-specific payloads
//! - [`group`] - Titled sections of rows
//! - [`parse`] - Reading schemas from JSON documents
//! - [`schema`] - Validated, indexed schema of one nesting level
//! - [`registry`] - Per-type editing contracts and value coercion
//! - [`store`] - Layered value sets and indexed keys

/// Row type tags, keyboard hints and interaction kinds.
pub mod types;

pub mod row;

pub mod group;

/// Schema documents to [`group::PropertyGroup`]s and back.
pub mod parse;

pub mod schema;

pub mod registry;

/// Input, default and output value sets of a session.
pub mod store;
