//! Editing sessions.
//!
//! - [`controller`] - Operations driven by a presentation layer
//! - [`nav`] - Session lifecycle and the navigation stack
//! - [`delegate`] - Host callbacks

pub mod controller;

pub mod delegate;

pub mod nav;
