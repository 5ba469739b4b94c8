//! SQLite storage for the Weaver control plane.
//!
//! Provides persistence for host registrations, hosts, check-in telemetry,
//! and the work queue.

mod db;
mod models;
mod queries_checkins;
mod queries_hosts;
mod queries_registrations;
mod queries_work;

#[cfg(test)]
mod tests;

pub use db::{DatabaseError, FleetDb};
pub use models::*;
pub use queries_checkins::NewCheckinParams;
pub use queries_hosts::HostDetailsParams;
pub use queries_registrations::NewRegistrationParams;
pub use queries_work::NewWorkParams;
