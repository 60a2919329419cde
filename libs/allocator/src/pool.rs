//! The dose pool: consumer registry, counters, and allocation algorithms.
//!
//! All state sits behind a single mutex. Every public method takes the lock
//! exactly once for its whole duration and never calls another locking
//! method while holding it, so passes are linearizable and never interleave.
//! Lock hold time is bounded by one linear pass (plus a sort) over the
//! registry.

use std::cmp::Reverse;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::consumer::{ConsumerId, ConsumerRecord, ConsumerSpec};
use crate::error::AllocError;
use crate::policy::AllocationPolicy;
use crate::MIN_GUARANTEE;

/// A single grant made during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub consumer_id: ConsumerId,
    pub amount: u64,
}

/// Grants made by one pass, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub grants: Vec<Grant>,
}

impl Allocation {
    /// Total doses handed out by the pass.
    pub fn total(&self) -> u64 {
        self.grants.iter().map(|g| g.amount).sum()
    }

    /// Doses handed to one consumer by the pass.
    pub fn granted_to(&self, id: ConsumerId) -> u64 {
        self.grants
            .iter()
            .filter(|g| g.consumer_id == id)
            .map(|g| g.amount)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Outcome of one scheduling cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub policy: AllocationPolicy,
    /// Consumers charged wait time during accrual.
    pub waiting: usize,
    pub allocated: Allocation,
    pub starvation_detected: bool,
    pub remediated: Allocation,
    /// Pool balance once the cycle finished.
    pub available: u64,
    /// Pending-queue entries cleared by the drain phase.
    pub drained: usize,
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub total: u64,
    pub available: u64,
    pub granted: u64,
    pub consumers: usize,
    pub starved: usize,
}

/// Shared dose pool.
///
/// Constructed explicitly and shared by handle (`Arc<ResourcePool>`).
#[derive(Debug)]
pub struct ResourcePool {
    state: Mutex<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    total: u64,
    available: u64,
    consumers: Vec<ConsumerRecord>,
}

impl ResourcePool {
    /// Create a pool holding `initial` doses and no consumers.
    pub fn new(initial: u64) -> Self {
        Self {
            state: Mutex::new(PoolState {
                total: initial,
                available: initial,
                consumers: Vec::new(),
            }),
        }
    }

    /// Append a consumer to the registry.
    pub fn register(&self, spec: ConsumerSpec) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        if state.position(spec.id).is_some() {
            return Err(AllocError::DuplicateConsumer(spec.id));
        }

        debug!(
            consumer_id = %spec.id,
            name = %spec.name,
            priority = spec.priority,
            "Registered consumer"
        );
        state.consumers.push(ConsumerRecord::new(spec));
        Ok(())
    }

    /// Snapshot of every consumer, in registry order.
    ///
    /// The returned records are owned copies; later pool mutations are not
    /// visible through them.
    pub fn list_consumers(&self) -> Vec<ConsumerRecord> {
        self.state.lock().consumers.clone()
    }

    /// Snapshot of a single consumer.
    pub fn consumer(&self, id: ConsumerId) -> Option<ConsumerRecord> {
        let state = self.state.lock();
        state.position(id).map(|idx| state.consumers[idx].clone())
    }

    /// Add doses to the pool.
    ///
    /// Negative amounts are rejected rather than allowed to drain the books.
    pub fn replenish(&self, amount: i64) -> Result<(), AllocError> {
        let doses = u64::try_from(amount).map_err(|_| AllocError::InvalidAmount {
            amount,
            reason: "replenishment must not be negative",
        })?;

        let mut state = self.state.lock();
        let overflow = AllocError::InvalidAmount {
            amount,
            reason: "replenishment overflows the pool",
        };
        let total = state.total.checked_add(doses).ok_or_else(|| overflow.clone())?;
        let available = state.available.checked_add(doses).ok_or(overflow)?;
        state.total = total;
        state.available = available;

        info!(amount = doses, total, available, "Replenished pool");
        Ok(())
    }

    /// Run one allocation pass with the given policy.
    #[instrument(skip(self))]
    pub fn allocate(&self, policy: AllocationPolicy) -> Allocation {
        self.state.lock().allocate(policy)
    }

    /// Returns true if any registered consumer is starved.
    pub fn has_starvation(&self) -> bool {
        self.state.lock().has_starvation()
    }

    /// Hand the minimum guarantee to every starved consumer while stock lasts.
    pub fn remediate_starvation(&self) -> Allocation {
        self.state.lock().remediate_starvation()
    }

    /// Replace a consumer's outstanding demand.
    pub fn set_request(&self, id: ConsumerId, amount: i64) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let idx = state.position(id).ok_or(AllocError::UnknownConsumer(id))?;
        state.consumers[idx].set_request(amount);
        Ok(())
    }

    /// Clear a consumer's accrued wait.
    pub fn reset_wait(&self, id: ConsumerId) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let idx = state.position(id).ok_or(AllocError::UnknownConsumer(id))?;
        state.consumers[idx].reset_wait();
        Ok(())
    }

    /// Charge `delta` wait to every consumer with open demand.
    ///
    /// Returns how many consumers were charged.
    pub fn accrue_wait(&self, delta: f64) -> usize {
        self.state.lock().accrue_wait(delta)
    }

    /// Accrue, allocate, and remediate as one exclusive section.
    #[instrument(skip(self))]
    pub fn run_cycle(&self, policy: AllocationPolicy, wait_unit: f64) -> CycleReport {
        let report = {
            let mut state = self.state.lock();
            let waiting = state.accrue_wait(wait_unit);
            let allocated = state.allocate(policy);
            let starvation_detected = state.has_starvation();
            let remediated = if starvation_detected {
                state.remediate_starvation()
            } else {
                Allocation::default()
            };

            CycleReport {
                policy,
                waiting,
                allocated,
                starvation_detected,
                remediated,
                available: state.available,
                drained: 0,
            }
        };

        if report.starvation_detected {
            warn!(
                remediated = report.remediated.total(),
                "Starvation detected, applied minimum guarantee"
            );
        }

        report
    }

    /// Doses not yet granted.
    pub fn available_amount(&self) -> u64 {
        self.state.lock().available
    }

    /// Doses ever introduced into the pool.
    pub fn total_amount(&self) -> u64 {
        self.state.lock().total
    }

    /// Snapshot of the pool counters.
    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            total: state.total,
            available: state.available,
            granted: state.granted(),
            consumers: state.consumers.len(),
            starved: state.consumers.iter().filter(|c| c.is_starved()).count(),
        }
    }
}

impl PoolState {
    fn position(&self, id: ConsumerId) -> Option<usize> {
        self.consumers.iter().position(|c| c.id == id)
    }

    fn granted(&self) -> u64 {
        self.consumers.iter().map(|c| c.granted).sum()
    }

    /// Grant `amount` to the consumer at `idx` and deduct it from the pool.
    fn grant_at(&mut self, idx: usize, amount: u64, allocation: &mut Allocation) {
        let consumer = &mut self.consumers[idx];
        consumer.grant(amount);
        self.available -= amount;

        debug!(
            consumer_id = %consumer.id,
            amount,
            remaining_request = consumer.requested,
            available = self.available,
            "Granted doses"
        );
        allocation.grants.push(Grant {
            consumer_id: consumer.id,
            amount,
        });
    }

    fn allocate(&mut self, policy: AllocationPolicy) -> Allocation {
        let mut order: Vec<usize> = (0..self.consumers.len()).collect();

        // Stable sorts keep registry order among equal keys.
        match policy {
            AllocationPolicy::Fcfs => {}
            AllocationPolicy::Priority => {
                order.sort_by_key(|&idx| Reverse(self.consumers[idx].priority));
            }
            AllocationPolicy::Sjf => {
                order.sort_by_key(|&idx| self.consumers[idx].requested);
            }
            AllocationPolicy::FairShare => return self.fair_share(),
        }

        self.walk(order)
    }

    /// Grant `min(requested, available)` in the given order until either runs out.
    fn walk(&mut self, order: Vec<usize>) -> Allocation {
        let mut allocation = Allocation::default();

        for idx in order {
            if self.available == 0 {
                break;
            }

            let amount = self.consumers[idx].requested.min(self.available);
            if amount > 0 {
                self.grant_at(idx, amount, &mut allocation);
            }
        }

        allocation
    }

    /// Proportional pass.
    ///
    /// Shares are computed against the balance at pass start, so grants do
    /// not depend on registry order. Floor truncation may leave a remainder;
    /// it stays in the pool for the next cycle.
    fn fair_share(&mut self) -> Allocation {
        let mut allocation = Allocation::default();

        let total_demand: u128 = self.consumers.iter().map(|c| u128::from(c.requested)).sum();
        if total_demand == 0 {
            return allocation;
        }

        let start = u128::from(self.available);
        for idx in 0..self.consumers.len() {
            if self.available == 0 {
                break;
            }

            let requested = self.consumers[idx].requested;
            if requested == 0 {
                continue;
            }

            // share <= start, so the narrowing cannot truncate.
            let share = (start * u128::from(requested) / total_demand) as u64;
            let amount = share.min(requested).min(self.available);
            if amount > 0 {
                self.grant_at(idx, amount, &mut allocation);
            }
        }

        allocation
    }

    fn has_starvation(&self) -> bool {
        self.consumers.iter().any(ConsumerRecord::is_starved)
    }

    fn remediate_starvation(&mut self) -> Allocation {
        let mut allocation = Allocation::default();

        for idx in 0..self.consumers.len() {
            if self.available < MIN_GUARANTEE {
                break;
            }

            let consumer = &self.consumers[idx];
            if consumer.is_starved() {
                let amount = MIN_GUARANTEE.min(consumer.requested);
                self.grant_at(idx, amount, &mut allocation);
            }
        }

        allocation
    }

    fn accrue_wait(&mut self, delta: f64) -> usize {
        let mut charged = 0;
        for consumer in self.consumers.iter_mut().filter(|c| c.is_waiting()) {
            consumer.accrue_wait(delta);
            charged += 1;
        }
        charged
    }
}
