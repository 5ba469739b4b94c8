//! Weaver Core Library
//!
//! Shared functionality for Weaver components:
//! - `SQLite` pool creation and the `define_database!` macro
//! - Unix timestamp helper
//! - Tracing/logging initialisation

pub mod db;
pub mod tracing_init;

pub use db::{DatabaseError, unix_timestamp};
pub use tracing_init::init_tracing;
