//! Weaver Control-Plane Server
//!
//! Library crate backing the `weaver-server` binary. Hosts bootstrap trust
//! with one-time registration keys, exchange their durable credential for
//! short-lived access tokens, report telemetry through check-ins, and drain
//! a per-host FIFO work queue.

pub mod actor;
pub mod auth;
pub mod checkin;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod ratelimit;
pub mod registration;
pub mod registry;
pub mod server;
pub mod storage;
pub mod token;

pub use error::FleetError;
