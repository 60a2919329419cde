//! Periodic allocation worker.
//!
//! Runs a scheduler cycle on a fixed interval so that wait time keeps
//! accruing even when no caller drives `/api/allocate`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, instrument};
use vaxishare_allocator::{AllocationPolicy, RequestScheduler};

/// Worker that drives allocation cycles until shutdown.
pub struct CycleWorker {
    scheduler: Arc<RequestScheduler>,
    policy: AllocationPolicy,
    interval: Duration,
}

impl CycleWorker {
    pub fn new(
        scheduler: Arc<RequestScheduler>,
        policy: AllocationPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            policy,
            interval,
        }
    }

    /// Run cycles until shutdown is signaled.
    #[instrument(skip(self, shutdown), fields(policy = %self.policy))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting cycle worker"
        );

        let mut interval = cycle_interval(self.interval);
        // Don't immediately tick on startup - wait for first interval
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.scheduler.run_cycle(self.policy);
                    if report.allocated.is_empty() && report.remediated.is_empty() {
                        debug!(waiting = report.waiting, "Cycle granted nothing");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Cycle worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Every cycle charges a wait unit, so ticks missed during a stall are
/// delayed rather than replayed back to back.
fn cycle_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
