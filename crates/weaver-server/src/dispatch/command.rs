//! Work command payloads.
//!
//! The dispatcher stores commands opaquely and never interprets them beyond
//! the discriminant; hosts deserialize and execute them. The serialized form
//! is adjacently tagged (`targetType` + `payload`), so the stored JSON is the
//! same shape operators submit and hosts receive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "targetType",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum WorkCommand {
    /// Ask the host to report its current status immediately.
    ReportStatus,
    /// Stop, restart, or self-update the host agent.
    HostLifecycle { action: LifecycleAction },
    /// Ask the host to push a fresh hardware/OS descriptor.
    RefreshDetails,
    InstallServer {
        server_id: String,
        game_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    UpdateServer {
        server_id: String,
    },
    UninstallServer {
        server_id: String,
    },
    ServerState {
        server_id: String,
        action: ServerAction,
    },
    ApplyConfig {
        server_id: String,
        entries: Vec<ConfigEntry>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Stop,
    Restart,
    UpdateAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    Start,
    Stop,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

impl WorkCommand {
    /// Discriminant stored in the `target_type` column for filtering.
    pub const fn target_type(&self) -> &'static str {
        match self {
            Self::ReportStatus => "report_status",
            Self::HostLifecycle { .. } => "host_lifecycle",
            Self::RefreshDetails => "refresh_details",
            Self::InstallServer { .. } => "install_server",
            Self::UpdateServer { .. } => "update_server",
            Self::UninstallServer { .. } => "uninstall_server",
            Self::ServerState { .. } => "server_state",
            Self::ApplyConfig { .. } => "apply_config",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_target_type_and_payload() {
        let cmd = WorkCommand::ServerState {
            server_id: "s1".to_string(),
            action: ServerAction::Restart,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["targetType"], "server_state");
        assert_eq!(json["payload"]["serverId"], "s1");
        assert_eq!(json["payload"]["action"], "restart");

        let back: WorkCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn unit_commands_need_no_payload() {
        let cmd: WorkCommand = serde_json::from_str("{\"targetType\":\"report_status\"}").unwrap();
        assert_eq!(cmd, WorkCommand::ReportStatus);
    }

    #[test]
    fn install_omits_missing_version() {
        let cmd = WorkCommand::InstallServer {
            server_id: "s1".to_string(),
            game_id: "g1".to_string(),
            version: None,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(!json.contains("version"));
    }

    #[test]
    fn target_type_matches_wire_tag() {
        let cmd = WorkCommand::ApplyConfig {
            server_id: "s1".to_string(),
            entries: vec![ConfigEntry {
                key: "max_players".to_string(),
                value: "16".to_string(),
            }],
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["targetType"], cmd.target_type());
    }

    #[test]
    fn unknown_target_type_is_rejected() {
        let err = serde_json::from_str::<WorkCommand>("{\"targetType\":\"format_disk\"}");
        assert!(err.is_err());
    }
}
