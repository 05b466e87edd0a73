// Container models

use serde::{Deserialize, Serialize};

use crate::classify::Liveness;

/// Docker container state parsed from the backend's free-form label; serializes lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Created,
    Restarting,
    Paused,
    Exited,
    Dead,
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Parse from a Docker state label (e.g. "running", "exited").
    pub fn from_label(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" => ContainerState::Running,
            "created" => ContainerState::Created,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub id: String,
    pub name: String,
    /// Label exactly as reported by the backend.
    pub status: String,
    pub state: ContainerState,
    /// True only for the exact label "running".
    pub live: bool,
}

impl ContainerStatus {
    pub fn new(id: String, name: String, status: String) -> Self {
        let state = ContainerState::from_label(&status);
        let live = status == "running";
        Self {
            id,
            name,
            status,
            state,
            live,
        }
    }

    pub fn liveness(&self) -> Liveness {
        if self.live { Liveness::Up } else { Liveness::Down }
    }
}
