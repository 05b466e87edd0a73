// Dashboard state store: latest committed snapshot, last success time and connectivity.
// Single writer (the scheduler); readers clone the state or subscribe to changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::change::{Transition, diff};
use crate::models::{Connectivity, DashboardState, Snapshot};

/// Consecutive-failure thresholds for connectivity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityPolicy {
    pub degraded_after: u32,
    pub disconnected_after: u32,
}

impl Default for ConnectivityPolicy {
    fn default() -> Self {
        Self {
            degraded_after: 2,
            disconnected_after: 5,
        }
    }
}

impl ConnectivityPolicy {
    pub fn connectivity(&self, consecutive_failures: u32) -> Connectivity {
        if consecutive_failures >= self.disconnected_after {
            Connectivity::Disconnected
        } else if consecutive_failures >= self.degraded_after {
            Connectivity::Degraded
        } else {
            Connectivity::Connected
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(Arc<[Transition]>),
    /// Not newer than the last committed snapshot; state unchanged.
    Stale {
        captured_at: DateTime<Utc>,
        last_success_at: Option<DateTime<Utc>>,
    },
}

pub struct DashboardStore {
    tx: watch::Sender<DashboardState>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(DashboardState::default());
        Self { tx }
    }

    pub fn state(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().latest.clone()
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.tx.borrow().last_success_at
    }

    pub fn connectivity(&self) -> Connectivity {
        self.tx.borrow().connectivity
    }

    pub fn transitions(&self) -> Arc<[Transition]> {
        self.tx.borrow().transitions.clone()
    }

    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Replaces the latest snapshot if `snapshot` is strictly newer than the last commit.
    pub fn commit(&self, snapshot: Snapshot) -> CommitOutcome {
        let captured_at = snapshot.captured_at;
        let mut committed = None;
        let mut last_seen = None;
        self.tx.send_if_modified(|state| {
            if let Some(last) = state.last_success_at
                && captured_at <= last
            {
                last_seen = Some(last);
                return false;
            }
            let transitions: Arc<[Transition]> =
                diff(state.latest.as_deref(), &snapshot).into();
            state.latest = Some(Arc::new(snapshot));
            state.last_success_at = Some(captured_at);
            state.connectivity = Connectivity::Connected;
            state.consecutive_failures = 0;
            state.transitions = transitions.clone();
            committed = Some(transitions);
            true
        });
        match committed {
            Some(transitions) => CommitOutcome::Committed(transitions),
            None => CommitOutcome::Stale {
                captured_at,
                last_success_at: last_seen,
            },
        }
    }

    /// Counts a failed cycle and returns the resulting connectivity. The snapshot is untouched.
    /// Before the first successful commit the pipeline stays disconnected.
    /// Subscribers are notified only when connectivity changes.
    pub fn record_failure(&self, policy: &ConnectivityPolicy) -> Connectivity {
        let mut connectivity = Connectivity::Disconnected;
        self.tx.send_if_modified(|state| {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            let next = if state.last_success_at.is_none() {
                Connectivity::Disconnected
            } else {
                policy.connectivity(state.consecutive_failures)
            };
            connectivity = next;
            let changed = state.connectivity != next;
            state.connectivity = next;
            changed
        });
        connectivity
    }
}

/// Receives every state change. Dropping it (or calling `unsubscribe`) ends the subscription.
pub struct StateSubscription {
    rx: watch::Receiver<DashboardState>,
}

impl StateSubscription {
    /// Current state, marking it as seen.
    pub fn current(&mut self) -> DashboardState {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next change. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<DashboardState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_tiers() {
        let p = ConnectivityPolicy {
            degraded_after: 2,
            disconnected_after: 4,
        };
        assert_eq!(p.connectivity(0), Connectivity::Connected);
        assert_eq!(p.connectivity(1), Connectivity::Connected);
        assert_eq!(p.connectivity(2), Connectivity::Degraded);
        assert_eq!(p.connectivity(3), Connectivity::Degraded);
        assert_eq!(p.connectivity(4), Connectivity::Disconnected);
    }

    #[test]
    fn policy_immediate_disconnect_when_thresholds_equal() {
        let p = ConnectivityPolicy {
            degraded_after: 2,
            disconnected_after: 2,
        };
        assert_eq!(p.connectivity(2), Connectivity::Disconnected);
    }

    #[test]
    fn failures_before_first_commit_stay_disconnected() {
        let store = DashboardStore::new();
        let policy = ConnectivityPolicy::default();
        for _ in 0..3 {
            assert_eq!(store.record_failure(&policy), Connectivity::Disconnected);
        }
        let state = store.state();
        assert!(state.latest.is_none());
        assert_eq!(state.consecutive_failures, 3);
    }
}
