//! # vaxishare-allocator
//!
//! Allocation engine for a finite, replenishable pool of doses shared by
//! competing consumers (hospitals). Scheduling policies are borrowed from
//! process scheduling:
//!
//! - **FCFS**: registry order.
//! - **PRIORITY**: highest `priority` first.
//! - **FAIR_SHARE**: proportional to outstanding demand.
//! - **SJF**: smallest outstanding request first.
//!
//! A starvation pass runs after every cycle and hands a minimum guarantee to
//! consumers that have waited past [`STARVATION_THRESHOLD`].
//!
//! # Invariants
//!
//! - `total - available == sum(granted)` after every operation
//! - `0 <= available <= total`
//! - `requested >= 0` for every consumer (carried by the type)
//! - Every pool operation is one exclusive section; sections never interleave

mod consumer;
mod error;
mod policy;
mod pool;
mod scheduler;

pub use consumer::{ConsumerId, ConsumerRecord, ConsumerSpec};
pub use error::AllocError;
pub use policy::AllocationPolicy;
pub use pool::{Allocation, CycleReport, Grant, PoolStatus, ResourcePool};
pub use scheduler::{RequestScheduler, SchedulerMetrics};

/// Wait time (in cycle units) a consumer may accrue with an open request
/// before it is considered starved.
pub const STARVATION_THRESHOLD: f64 = 10.0;

/// Doses handed to each starved consumer by a remediation pass.
pub const MIN_GUARANTEE: u64 = 10;

/// Wait time charged per cycle to every consumer with an open request.
pub const WAIT_UNIT: f64 = 1.0;

/// Divisor turning a raw risk weight (high-risk population) into a need factor.
pub const RISK_SCALE: f64 = 1000.0;
