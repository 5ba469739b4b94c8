//! Data models for fleet storage.
//!
//! Rows map 1:1 onto the tables in `migrations/`. `credential_hash` and
//! `key_hash` never leave the server; the HTTP layer exposes view structs
//! instead of these rows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Host {
    pub id: String,
    pub owner_id: String,
    /// Argon2id PHC string; `None` until the registration is confirmed.
    pub credential_hash: Option<String>,
    pub hostname: String,
    pub friendly_name: String,
    pub description: String,
    pub private_address: String,
    pub public_address: String,
    /// One of `unregistered`, `registered`, `online`, `offline`.
    pub current_state: String,
    pub os: String,
    pub cpu_info: String,
    pub network_info: String,
    pub storage_info: String,
    pub last_checkin_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    pub modified_by: String,
    pub modified_at: i64,
    pub deleted_at: Option<i64>,
}

impl Host {
    /// A host is operational once its registration has been confirmed.
    pub const fn is_confirmed(&self) -> bool {
        self.credential_hash.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HostRegistration {
    pub id: String,
    pub host_id: String,
    pub description: String,
    /// 1 while the one-time key is still redeemable, 0 after confirmation.
    pub active: i64,
    pub key_hash: String,
    pub activation_timestamp: Option<i64>,
    pub activation_source_address: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub modified_by: String,
    pub modified_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HostCheckin {
    pub id: i64,
    pub host_id: String,
    /// Client-reported send time, kept only for skew diagnostics.
    pub send_timestamp: i64,
    /// Server clock at receive time; authoritative.
    pub receive_timestamp: i64,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub uptime_secs: i64,
    pub network_in_bytes: i64,
    pub network_out_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkItem {
    pub id: i64,
    pub host_id: String,
    pub target_type: String,
    pub status: String,
    /// Serialized `WorkCommand`, stored opaquely.
    pub work_data: String,
    pub result_data: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub modified_by: String,
    pub modified_at: i64,
}
