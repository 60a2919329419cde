//! Allocation policy selector.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AllocError;

/// Scheduling policy applied by one allocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPolicy {
    /// First-come-first-served, in registry order.
    Fcfs,

    /// Highest priority first; registry order breaks ties.
    Priority,

    /// Proportional to outstanding demand, against the pass-start balance.
    FairShare,

    /// Shortest job (smallest request) first; registry order breaks ties.
    Sjf,
}

impl AllocationPolicy {
    /// All policies, in declaration order.
    pub const ALL: [AllocationPolicy; 4] = [Self::Fcfs, Self::Priority, Self::FairShare, Self::Sjf];

    /// Returns the wire name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fcfs => "FCFS",
            Self::Priority => "PRIORITY",
            Self::FairShare => "FAIR_SHARE",
            Self::Sjf => "SJF",
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationPolicy {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AllocError::UnknownPolicy(s.to_string()))
    }
}
