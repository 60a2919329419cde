//! Request scheduler: admission queue, allocation cycles, and wait metrics.
//!
//! Each cycle runs four phases in a fixed order:
//!
//! 1. **Accrual**: every consumer with open demand is charged one wait unit.
//! 2. **Allocation**: the selected policy runs against the pool.
//! 3. **Remediation**: starved consumers receive the minimum guarantee.
//! 4. **Drain**: the pending queue is cleared.
//!
//! Phases 1-3 run as one exclusive section on the pool. The scheduler's own
//! lock is never held while the pool lock is taken.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::consumer::ConsumerId;
use crate::error::AllocError;
use crate::policy::AllocationPolicy;
use crate::pool::{CycleReport, ResourcePool};
use crate::WAIT_UNIT;

/// Snapshot of the scheduler's running counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulerMetrics {
    pub total_wait_accrued: f64,
    pub total_requests_served: u64,
    pub average_wait_time: f64,
    pub throughput: f64,
    pub pending: usize,
}

/// Drives allocation cycles against a shared pool.
#[derive(Debug)]
pub struct RequestScheduler {
    pool: Arc<ResourcePool>,
    state: Mutex<SchedulerState>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    /// Admission log of accepted requests, cleared every cycle.
    pending: VecDeque<ConsumerId>,
    total_wait_accrued: f64,
    total_requests_served: u64,
}

impl SchedulerState {
    fn average_wait_time(&self) -> f64 {
        if self.total_requests_served == 0 {
            return 0.0;
        }
        self.total_wait_accrued / self.total_requests_served as f64
    }

    fn throughput(&self) -> f64 {
        if self.total_wait_accrued == 0.0 {
            return 0.0;
        }
        self.total_requests_served as f64 / self.total_wait_accrued
    }
}

impl RequestScheduler {
    /// Create a scheduler driving `pool`.
    pub fn new(pool: Arc<ResourcePool>) -> Self {
        Self {
            pool,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// The pool this scheduler drives.
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Replace a consumer's demand and log the request.
    ///
    /// An unknown id is reported as [`AllocError::UnknownConsumer`] and
    /// leaves both the pool and the queue untouched.
    pub fn add_request(&self, id: ConsumerId, amount: i64) -> Result<(), AllocError> {
        self.pool.set_request(id, amount)?;

        let mut state = self.state.lock();
        state.pending.push_back(id);
        state.total_requests_served += 1;

        debug!(consumer_id = %id, amount, pending = state.pending.len(), "Accepted request");
        Ok(())
    }

    /// Run one accrue, allocate, remediate, drain cycle.
    #[instrument(skip(self))]
    pub fn run_cycle(&self, policy: AllocationPolicy) -> CycleReport {
        let mut report = self.pool.run_cycle(policy, WAIT_UNIT);

        {
            let mut state = self.state.lock();
            state.total_wait_accrued += report.waiting as f64 * WAIT_UNIT;
            report.drained = state.pending.len();
            state.pending.clear();
        }

        info!(
            policy = %report.policy,
            waiting = report.waiting,
            allocated = report.allocated.total(),
            remediated = report.remediated.total(),
            available = report.available,
            drained = report.drained,
            "Allocation cycle complete"
        );

        report
    }

    /// Ids logged since the last cycle, oldest first.
    pub fn pending(&self) -> Vec<ConsumerId> {
        self.state.lock().pending.iter().copied().collect()
    }

    /// Accrued wait per accepted request, or 0 before any request.
    pub fn average_wait_time(&self) -> f64 {
        self.state.lock().average_wait_time()
    }

    /// Accepted requests per unit of accrued wait, or 0 before any wait.
    pub fn throughput(&self) -> f64 {
        self.state.lock().throughput()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        let state = self.state.lock();
        SchedulerMetrics {
            total_wait_accrued: state.total_wait_accrued,
            total_requests_served: state.total_requests_served,
            average_wait_time: state.average_wait_time(),
            throughput: state.throughput(),
            pending: state.pending.len(),
        }
    }

    /// Zero the running counters. The pending queue is left alone.
    pub fn reset_metrics(&self) {
        let mut state = self.state.lock();
        state.total_wait_accrued = 0.0;
        state.total_requests_served = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ConsumerSpec;
    use crate::{MIN_GUARANTEE, STARVATION_THRESHOLD};

    const A: ConsumerId = ConsumerId::new(1);
    const B: ConsumerId = ConsumerId::new(2);

    fn scheduler(initial: u64) -> RequestScheduler {
        let pool = Arc::new(ResourcePool::new(initial));
        pool.register(ConsumerSpec::new(A, "City General Hospital", 3, 5000))
            .unwrap();
        pool.register(ConsumerSpec::new(B, "Rural Clinic", 1, 1000))
            .unwrap();
        RequestScheduler::new(pool)
    }

    #[test]
    fn test_add_request_sets_demand_and_queues() {
        let scheduler = scheduler(100);

        scheduler.add_request(A, 30).unwrap();
        scheduler.add_request(B, 10).unwrap();
        scheduler.add_request(A, 20).unwrap();

        assert_eq!(scheduler.pending(), vec![A, B, A]);
        assert_eq!(scheduler.pool().consumer(A).unwrap().requested, 20);
        assert_eq!(scheduler.metrics().total_requests_served, 3);
    }

    #[test]
    fn test_add_request_unknown_id_mutates_nothing() {
        let scheduler = scheduler(100);
        let before = scheduler.pool().list_consumers();

        let err = scheduler.add_request(ConsumerId::new(99), 30).unwrap_err();

        assert_eq!(err, AllocError::UnknownConsumer(ConsumerId::new(99)));
        assert!(scheduler.pending().is_empty());
        assert_eq!(scheduler.metrics().total_requests_served, 0);
        assert_eq!(scheduler.pool().list_consumers(), before);
    }

    #[test]
    fn test_negative_request_clamps_to_zero() {
        let scheduler = scheduler(100);
        scheduler.add_request(A, -25).unwrap();
        assert_eq!(scheduler.pool().consumer(A).unwrap().requested, 0);
    }

    #[test]
    fn test_cycle_accrues_allocates_and_drains() {
        let scheduler = scheduler(25);
        scheduler.add_request(A, 20).unwrap();
        scheduler.add_request(B, 10).unwrap();

        let report = scheduler.run_cycle(AllocationPolicy::Fcfs);

        assert_eq!(report.waiting, 2);
        assert_eq!(report.allocated.granted_to(A), 20);
        assert_eq!(report.allocated.granted_to(B), 5);
        assert_eq!(report.drained, 2);
        assert!(scheduler.pending().is_empty());

        // Both were waiting when the cycle started.
        let pool = scheduler.pool();
        assert_eq!(pool.consumer(A).unwrap().wait_time, 1.0);
        assert_eq!(pool.consumer(B).unwrap().wait_time, 1.0);
        assert_eq!(scheduler.metrics().total_wait_accrued, 2.0);
    }

    #[test]
    fn test_cycle_without_demand_accrues_nothing() {
        let scheduler = scheduler(25);

        let report = scheduler.run_cycle(AllocationPolicy::Priority);

        assert_eq!(report.waiting, 0);
        assert!(report.allocated.is_empty());
        assert_eq!(scheduler.metrics().total_wait_accrued, 0.0);
    }

    #[test]
    fn test_starvation_detected_after_repeated_cycles() {
        let scheduler = scheduler(0);
        scheduler.add_request(A, 35).unwrap();

        for _ in 0..11 {
            let report = scheduler.run_cycle(AllocationPolicy::Sjf);
            assert!(report.remediated.is_empty());
        }

        let starving = scheduler.pool().consumer(A).unwrap();
        assert!(starving.wait_time > STARVATION_THRESHOLD);
        assert!(starving.is_starved());

        // Stock arrives, but SJF hands all of it to A first; what remains is
        // below the guarantee, so the remediation pass has nothing to give.
        scheduler.pool().replenish(5).unwrap();
        let report = scheduler.run_cycle(AllocationPolicy::Sjf);
        assert_eq!(report.allocated.granted_to(A), 5);
        assert!(report.starvation_detected);
        assert!(report.remediated.is_empty());
        assert_eq!(scheduler.pool().consumer(A).unwrap().requested, 30);
    }

    #[test]
    fn test_remediation_runs_after_allocation() {
        let scheduler = scheduler(0);
        scheduler.add_request(A, 100).unwrap();
        scheduler.add_request(B, 40).unwrap();
        for _ in 0..11 {
            scheduler.run_cycle(AllocationPolicy::Fcfs);
        }

        // Fair share of 30 against demand 140: A gets 21, B gets 8, 1 left.
        // Too little for a guarantee, so only the proportional grants apply.
        scheduler.pool().replenish(30).unwrap();
        let report = scheduler.run_cycle(AllocationPolicy::FairShare);
        assert_eq!(report.allocated.granted_to(A), 21);
        assert_eq!(report.allocated.granted_to(B), 8);
        assert!(report.remediated.is_empty());

        // Ample stock: the priority pass clears all demand before remediation looks.
        scheduler.pool().replenish(200).unwrap();
        let report = scheduler.run_cycle(AllocationPolicy::Priority);
        assert_eq!(report.allocated.total(), 79 + 32);
        assert!(!report.starvation_detected);

        let pool = scheduler.pool();
        assert_eq!(pool.consumer(A).unwrap().requested, 0);
        assert_eq!(pool.consumer(B).unwrap().requested, 0);
    }

    #[test]
    fn test_remediation_grants_minimum_guarantee() {
        let scheduler = scheduler(0);
        scheduler.add_request(A, 50).unwrap();
        for _ in 0..11 {
            scheduler.run_cycle(AllocationPolicy::Fcfs);
        }
        assert!(scheduler.pool().has_starvation());

        scheduler.pool().replenish(10).unwrap();
        let remediated = scheduler.pool().remediate_starvation();

        assert_eq!(remediated.granted_to(A), MIN_GUARANTEE);
        assert_eq!(scheduler.pool().consumer(A).unwrap().requested, 40);
    }

    #[test]
    fn test_metrics_ratios() {
        let scheduler = scheduler(0);
        scheduler.add_request(A, 10).unwrap();
        scheduler.add_request(B, 10).unwrap();

        // Nothing to hand out: two consumers wait through each of three cycles.
        for _ in 0..3 {
            scheduler.run_cycle(AllocationPolicy::Fcfs);
        }

        let metrics = scheduler.metrics();
        assert_eq!(metrics.total_wait_accrued, 6.0);
        assert_eq!(metrics.total_requests_served, 2);
        assert_eq!(scheduler.average_wait_time(), 3.0);
        assert!((scheduler.throughput() - 2.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metrics_are_zero_before_history() {
        let scheduler = scheduler(10);
        assert_eq!(scheduler.average_wait_time(), 0.0);
        assert_eq!(scheduler.throughput(), 0.0);

        // Requests served but no wait accrued yet.
        scheduler.add_request(A, 5).unwrap();
        assert_eq!(scheduler.throughput(), 0.0);
        assert_eq!(scheduler.average_wait_time(), 0.0);
    }

    #[test]
    fn test_reset_metrics_zeroes_ratios() {
        let scheduler = scheduler(0);
        scheduler.add_request(A, 10).unwrap();
        for _ in 0..4 {
            scheduler.run_cycle(AllocationPolicy::Fcfs);
        }
        assert!(scheduler.average_wait_time() > 0.0);

        scheduler.reset_metrics();

        assert_eq!(scheduler.average_wait_time(), 0.0);
        assert_eq!(scheduler.throughput(), 0.0);
        // Consumer wait clocks are pool state and survive a metrics reset.
        assert_eq!(scheduler.pool().consumer(A).unwrap().wait_time, 4.0);
    }
}
