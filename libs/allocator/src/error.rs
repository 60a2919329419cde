//! Error types for allocation operations.

use thiserror::Error;

use crate::consumer::ConsumerId;

/// Errors surfaced by the pool and scheduler.
///
/// Every variant is caller-correctable; none indicates a broken internal
/// invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// No consumer with this id is registered.
    #[error("unknown consumer: {0}")]
    UnknownConsumer(ConsumerId),

    /// A consumer with this id is already registered.
    #[error("consumer already registered: {0}")]
    DuplicateConsumer(ConsumerId),

    /// The amount cannot be applied to the pool.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: i64, reason: &'static str },

    /// The policy selector is not one of the known policies.
    #[error("unknown allocation policy: '{0}'")]
    UnknownPolicy(String),
}

impl AllocError {
    /// Returns true if the error refers to a missing consumer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AllocError::UnknownConsumer(_))
    }

    /// Returns true if the error is a registration conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AllocError::DuplicateConsumer(_))
    }

    /// Returns true if the caller passed a malformed argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            AllocError::InvalidAmount { .. } | AllocError::UnknownPolicy(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AllocError::UnknownConsumer(ConsumerId::new(7)).is_not_found());
        assert!(AllocError::DuplicateConsumer(ConsumerId::new(7)).is_conflict());
        assert!(AllocError::UnknownPolicy("LIFO".into()).is_invalid_argument());

        let err = AllocError::InvalidAmount {
            amount: -5,
            reason: "replenishment must not be negative",
        };
        assert!(err.is_invalid_argument());
        assert!(!err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AllocError::UnknownConsumer(ConsumerId::new(42)).to_string(),
            "unknown consumer: 42"
        );
        assert_eq!(
            AllocError::UnknownPolicy("LIFO".into()).to_string(),
            "unknown allocation policy: 'LIFO'"
        );
    }
}
