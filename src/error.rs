//! Error types for reservation lifecycle and validation.

use thiserror::Error;

use crate::state::ReservationStatus;
use crate::validation::ValidationErrors;

/// Result type alias using the reservation error type.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Everything a reservation operation can reject with.
///
/// All variants are recoverable by the caller. A rejected operation never
/// leaves a reservation partially updated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Target status is not reachable from the current status
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Cancellation requested without a reason
    #[error("A reason is required to cancel a reservation")]
    MissingReason,

    /// Caller lacks the role or ownership for this action
    #[error("Not allowed to {0}")]
    Unauthorized(&'static str),

    /// One or more fields failed validation
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// No reservation with this id in the store
    #[error("Reservation not found: {0}")]
    NotFound(String),

    /// Stored reservation changed since the caller last read it
    #[error("Reservation was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict { expected: u64, actual: u64 },
}

impl ReservationError {
    /// Field errors carried by a validation failure, if any.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ReservationError::InvalidTransition {
            from: ReservationStatus::Completed,
            to: ReservationStatus::Approved,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition from Completed to Approved"
        );

        let err = ReservationError::Unauthorized("approve reservations");
        assert_eq!(err.to_string(), "Not allowed to approve reservations");
    }

    #[test]
    fn test_field_errors() {
        let mut errors = ValidationErrors::new();
        errors.insert("email", "Please enter a valid email address");
        let err = ReservationError::ValidationFailed(errors.clone());

        assert_eq!(err.field_errors(), Some(&errors));
        assert_eq!(ReservationError::MissingReason.field_errors(), None);
    }
}
