//! Consumer records: one hospital's allocation state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{RISK_SCALE, STARVATION_THRESHOLD};

/// Caller-assigned consumer identifier.
///
/// Ids are stable for the life of the pool and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(i64);

impl ConsumerId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration input for a new consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    pub id: ConsumerId,
    pub name: String,
    /// Higher is served first under the priority policy. No enforced range.
    pub priority: i64,
    /// Population-derived weight, only used by [`ConsumerRecord::need`].
    pub risk_weight: u64,
}

impl ConsumerSpec {
    pub fn new(
        id: ConsumerId,
        name: impl Into<String>,
        priority: i64,
        risk_weight: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            risk_weight,
        }
    }
}

/// Allocation state of a single consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerRecord {
    pub id: ConsumerId,
    pub name: String,
    pub priority: i64,
    /// Cumulative doses granted so far.
    pub granted: u64,
    /// Outstanding demand.
    pub requested: u64,
    pub risk_weight: u64,
    /// Cycles spent with an open request.
    pub wait_time: f64,
}

impl ConsumerRecord {
    /// Creates a record with no demand, no grants, and no accrued wait.
    pub fn new(spec: ConsumerSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            priority: spec.priority,
            granted: 0,
            requested: 0,
            risk_weight: spec.risk_weight,
            wait_time: 0.0,
        }
    }

    /// Replaces the outstanding demand. Negative amounts clamp to zero.
    ///
    /// A new request supersedes an unresolved one rather than adding to it.
    pub fn set_request(&mut self, amount: i64) {
        self.requested = u64::try_from(amount).unwrap_or(0);
    }

    /// Records `amount` doses handed to this consumer.
    ///
    /// The caller is responsible for deducting `amount` from the pool.
    pub fn grant(&mut self, amount: u64) {
        self.granted = self.granted.saturating_add(amount);
        self.requested = self.requested.saturating_sub(amount);
    }

    /// Adds `delta` to the accrued wait. Negative or non-finite deltas are ignored.
    pub fn accrue_wait(&mut self, delta: f64) {
        if delta.is_finite() && delta > 0.0 {
            self.wait_time += delta;
        }
    }

    /// Returns true if the consumer has open demand and has waited too long.
    pub fn is_starved(&self) -> bool {
        self.requested > 0 && self.wait_time > STARVATION_THRESHOLD
    }

    /// Risk-weighted shortage. Informational only; never gates allocation.
    pub fn need(&self) -> f64 {
        let shortage = self.requested.saturating_sub(self.granted) as f64;
        shortage * (self.risk_weight as f64 / RISK_SCALE)
    }

    /// Returns true if the consumer has open demand.
    pub fn is_waiting(&self) -> bool {
        self.requested > 0
    }

    /// Clears the accrued wait.
    pub fn reset_wait(&mut self) {
        self.wait_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ConsumerRecord {
        ConsumerRecord::new(ConsumerSpec::new(ConsumerId::new(1), "City General Hospital", 3, 5000))
    }

    #[test]
    fn test_new_record_is_idle() {
        let r = record();
        assert_eq!(r.granted, 0);
        assert_eq!(r.requested, 0);
        assert_eq!(r.wait_time, 0.0);
        assert!(!r.is_waiting());
        assert!(!r.is_starved());
    }

    #[test]
    fn test_set_request_clamps_and_supersedes() {
        let mut r = record();
        r.set_request(40);
        r.set_request(15);
        assert_eq!(r.requested, 15);

        r.set_request(-3);
        assert_eq!(r.requested, 0);
    }

    #[test]
    fn test_grant_floors_request_at_zero() {
        let mut r = record();
        r.set_request(5);
        r.grant(3);
        assert_eq!((r.granted, r.requested), (3, 2));

        r.grant(10);
        assert_eq!((r.granted, r.requested), (13, 0));
    }

    #[test]
    fn test_accrue_wait_ignores_bad_deltas() {
        let mut r = record();
        r.accrue_wait(1.0);
        r.accrue_wait(-4.0);
        r.accrue_wait(f64::NAN);
        r.accrue_wait(f64::INFINITY);
        assert_eq!(r.wait_time, 1.0);
    }

    #[test]
    fn test_starvation_needs_open_demand_and_long_wait() {
        let mut r = record();
        r.set_request(20);
        for _ in 0..10 {
            r.accrue_wait(1.0);
        }
        // Exactly at the threshold is not yet starved.
        assert!(!r.is_starved());

        r.accrue_wait(1.0);
        assert!(r.is_starved());

        r.grant(20);
        assert!(!r.is_starved());
    }

    #[test]
    fn test_need_is_risk_weighted_shortage() {
        let mut r = record();
        r.set_request(100);
        assert_eq!(r.need(), 100.0 * 5.0);

        r.grant(30);
        // requested 70, granted 30 -> shortage 40
        assert_eq!(r.need(), 40.0 * 5.0);

        r.grant(70);
        assert_eq!(r.need(), 0.0);
    }

    #[test]
    fn test_reset_wait_keeps_grants() {
        let mut r = record();
        r.set_request(5);
        r.accrue_wait(3.0);
        r.grant(5);

        r.reset_wait();
        assert_eq!(r.wait_time, 0.0);
        assert_eq!(r.granted, 5);
    }

    #[test]
    fn test_consumer_id_is_a_bare_number_on_the_wire() {
        let json = serde_json::to_string(&ConsumerId::new(12)).unwrap();
        assert_eq!(json, "12");
        assert_eq!(ConsumerId::new(12).to_string(), "12");

        let parsed: ConsumerId = serde_json::from_str("-3").unwrap();
        assert_eq!(parsed, ConsumerId::new(-3));
    }
}
