//! HTTP server implementation for the fleet control plane.

pub mod auth_layer;
pub mod host_api;
pub mod registration_api;
pub mod router;
pub mod work_api;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod registration_api_tests;

pub use auth_layer::AuthIdentity;
pub use router::{AppState, build_router};
