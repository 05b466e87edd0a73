// Poll scheduler: drives the aggregator on a fixed cadence and commits results to the store.
// At most one cycle is in flight; ticks that come due while a cycle runs are skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::{Instrument, debug, info, warn};

use crate::aggregator::SnapshotAggregator;
use crate::backend::StatusSource;
use crate::change::Transition;
use crate::error::{AggregationError, ErrorKind};
use crate::models::Snapshot;
use crate::store::{CommitOutcome, ConnectivityPolicy, DashboardStore};

pub const DEFAULT_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval_ms: u64,
    pub policy: ConnectivityPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            policy: ConnectivityPolicy::default(),
        }
    }
}

/// Cycle counters, readable while the scheduler runs.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    cycles_committed: AtomicU64,
    cycles_failed: AtomicU64,
    ticks_skipped: AtomicU64,
    stale_discarded: AtomicU64,
}

impl SchedulerStats {
    pub fn cycles_committed(&self) -> u64 {
        self.cycles_committed.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::Relaxed)
    }

    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded.load(Ordering::Relaxed)
    }
}

/// Running scheduler. Dropping it ends the loop without waiting; `stop` waits.
pub struct SchedulerHandle {
    stopped: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
    stats: Arc<SchedulerStats>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Cancels the timer and any in-flight cycle. No callback fires after this returns.
    pub async fn stop(mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.join).await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

pub struct PollScheduler;

impl PollScheduler {
    /// Spawns the poll loop. The first cycle starts immediately. `on_commit` receives the new
    /// snapshot with its transitions; `on_failure` every failed cycle.
    pub fn start<S, C, F>(
        aggregator: Arc<SnapshotAggregator<S>>,
        store: Arc<DashboardStore>,
        config: SchedulerConfig,
        on_commit: C,
        on_failure: F,
    ) -> SchedulerHandle
    where
        S: StatusSource + 'static,
        C: FnMut(&Arc<Snapshot>, &[Transition]) + Send + 'static,
        F: FnMut(&AggregationError) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(SchedulerStats::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let span = tracing::info_span!("scheduler", interval_ms = config.interval_ms);
        let join = tokio::spawn(
            run(
                Cycle {
                    aggregator,
                    store,
                    policy: config.policy,
                    stopped: stopped.clone(),
                    stats: stats.clone(),
                    on_commit,
                    on_failure,
                },
                Duration::from_millis(config.interval_ms.max(1)),
                shutdown_rx,
            )
            .instrument(span),
        );

        info!(interval_ms = config.interval_ms, "poll scheduler started");
        SchedulerHandle {
            stopped,
            shutdown_tx: Some(shutdown_tx),
            join,
            stats,
        }
    }
}

struct Cycle<S, C, F> {
    aggregator: Arc<SnapshotAggregator<S>>,
    store: Arc<DashboardStore>,
    policy: ConnectivityPolicy,
    stopped: Arc<AtomicBool>,
    stats: Arc<SchedulerStats>,
    on_commit: C,
    on_failure: F,
}

async fn run<S, C, F>(
    mut cycle: Cycle<S, C, F>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    S: StatusSource,
    C: FnMut(&Arc<Snapshot>, &[Transition]),
    F: FnMut(&AggregationError),
{
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_cycle_end: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            scheduled = tick.tick() => {
                // With Skip, one overdue tick is delivered late; every deadline between it and
                // the end of the previous cycle was missed while that cycle was in flight.
                if let Some(end) = last_cycle_end
                    && scheduled < end
                {
                    let skipped = ((end - scheduled).as_nanos() / period.as_nanos()) as u64 + 1;
                    cycle.stats.ticks_skipped.fetch_add(skipped, Ordering::Relaxed);
                    debug!(
                        operation = "tick",
                        skipped,
                        "cycle outlasted the interval; ticks skipped"
                    );
                    continue;
                }

                let result = tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    r = cycle.aggregator.fetch_snapshot() => r,
                };
                last_cycle_end = Some(Instant::now());

                if cycle.stopped.load(Ordering::SeqCst) {
                    break;
                }
                cycle.settle(result);
            }
        }
    }
    debug!("poll scheduler stopped");
}

impl<S, C, F> Cycle<S, C, F>
where
    C: FnMut(&Arc<Snapshot>, &[Transition]),
    F: FnMut(&AggregationError),
{
    fn settle(&mut self, result: Result<Snapshot, AggregationError>) {
        match result {
            Ok(snapshot) => {
                let before = self.store.connectivity();
                match self.store.commit(snapshot) {
                    CommitOutcome::Committed(transitions) => {
                        self.stats.cycles_committed.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            operation = "commit",
                            transitions = transitions.len(),
                            "snapshot committed"
                        );
                        if before != self.store.connectivity() {
                            info!(from = ?before, to = "connected", "connectivity changed");
                        }
                        if let Some(latest) = self.store.latest() {
                            (self.on_commit)(&latest, &transitions);
                        }
                    }
                    CommitOutcome::Stale {
                        captured_at,
                        last_success_at,
                    } => {
                        self.stats.stale_discarded.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            operation = "commit",
                            %captured_at,
                            last_success_at = ?last_success_at,
                            "discarding stale snapshot"
                        );
                    }
                }
            }
            Err(e) => {
                self.stats.cycles_failed.fetch_add(1, Ordering::Relaxed);
                match e.kind() {
                    ErrorKind::SchemaViolation => warn!(
                        error = %e,
                        kind = %ErrorKind::SchemaViolation,
                        operation = "fetch_snapshot",
                        "backend response violated the status schema"
                    ),
                    ErrorKind::Network => warn!(
                        error = %e,
                        kind = %ErrorKind::Network,
                        operation = "fetch_snapshot",
                        "poll cycle failed"
                    ),
                }
                let before = self.store.connectivity();
                let after = self.store.record_failure(&self.policy);
                if before != after {
                    info!(from = ?before, to = ?after, "connectivity changed");
                }
                (self.on_failure)(&e);
            }
        }
    }
}
