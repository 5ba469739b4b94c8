//! SQLite database handle for the fleet control plane.

pub use weaver_core::db::DatabaseError;

weaver_core::define_database!(FleetDb, "Fleet database migrations complete");
