//! Work item status machine.
//!
//! `waiting -> picked_up -> in_progress -> {completed | failed}` driven by
//! the owning host; `cancelled` reachable from any non-terminal state by an
//! operator. Everything else is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Waiting,
    PickedUp,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl WorkStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::PickedUp => "picked_up",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(Self::Waiting),
            "picked_up" => Some(Self::PickedUp),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal items never change status again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `actor` may move an item from `self` to `to`.
    ///
    /// Hosts drive the forward path on their own items; operators may only
    /// cancel. `System` drives no transitions.
    pub fn can_transition(self, to: Self, actor: &Actor) -> bool {
        match (self, to) {
            (Self::Waiting, Self::PickedUp)
            | (Self::PickedUp, Self::InProgress)
            | (Self::InProgress, Self::Completed | Self::Failed) => actor.is_host(),
            (from, Self::Cancelled) => !from.is_terminal() && actor.is_operator(),
            _ => false,
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
