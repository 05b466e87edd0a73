// Dashboard state held by the store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Snapshot;
use crate::change::Transition;

/// Health of the polling pipeline itself, distinct from service liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Connected,
    Degraded,
    Disconnected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    /// Last committed snapshot; `None` until the first successful cycle.
    pub latest: Option<Arc<Snapshot>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub connectivity: Connectivity,
    pub consecutive_failures: u32,
    /// Transitions produced by the most recent commit.
    pub transitions: Arc<[Transition]>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            latest: None,
            last_success_at: None,
            connectivity: Connectivity::Disconnected,
            consecutive_failures: 0,
            transitions: Arc::from(Vec::new()),
        }
    }
}
