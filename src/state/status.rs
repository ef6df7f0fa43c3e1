//! Reservation status state machine.
//!
//! # State Diagram
//!
//! ```text
//!               approve               complete
//! ┌───────────┐ ───────▶ ┌──────────┐ ───────▶ ┌───────────┐
//! │ Requested │          │ Approved │          │ Completed │
//! └─────┬─────┘          └────┬─────┘          └───────────┘
//!       │ cancel (reason)     │ cancel (reason)
//!       ▼                     ▼
//! ┌──────────────────────────────────┐
//! │            Cancelled             │
//! └──────────────────────────────────┘
//! ```
//!
//! `Cancelled` and `Completed` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReservationError, Result};

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Submitted by a guest, waiting for staff
    #[default]
    Requested,
    /// Confirmed by staff
    Approved,
    /// Withdrawn by the guest or refused by staff
    Cancelled,
    /// Guest has been seated and served
    Completed,
}

/// Legal next statuses, indexed by [`ReservationStatus::index`].
const TRANSITIONS: [&[ReservationStatus]; 4] = [
    &[ReservationStatus::Approved, ReservationStatus::Cancelled],
    &[ReservationStatus::Completed, ReservationStatus::Cancelled],
    &[],
    &[],
];

/// Display language for status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl ReservationStatus {
    pub const ALL: [Self; 4] = [
        Self::Requested,
        Self::Approved,
        Self::Cancelled,
        Self::Completed,
    ];

    fn index(self) -> usize {
        match self {
            Self::Requested => 0,
            Self::Approved => 1,
            Self::Cancelled => 2,
            Self::Completed => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    /// Parse the wire name of a status.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses reachable in one step.
    pub fn allowed_targets(self) -> &'static [Self] {
        TRANSITIONS[self.index()]
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Check if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Check if the guest may still change contact details.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Requested | Self::Approved)
    }

    /// Human-readable label for guests and staff.
    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, Self::Requested) => "pending",
            (Locale::En, Self::Approved) => "confirmed",
            (Locale::En, Self::Cancelled) => "cancelled",
            (Locale::En, Self::Completed) => "completed",
            (Locale::ZhCn, Self::Requested) => "待确认",
            (Locale::ZhCn, Self::Approved) => "已确认",
            (Locale::ZhCn, Self::Cancelled) => "已取消",
            (Locale::ZhCn, Self::Completed) => "已完成",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One past status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: ReservationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: ReservationStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TransitionRequest {
    pub fn new(status: ReservationStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    pub fn approve() -> Self {
        Self::new(ReservationStatus::Approved)
    }

    pub fn complete() -> Self {
        Self::new(ReservationStatus::Completed)
    }

    pub fn cancel(reason: impl Into<String>) -> Self {
        Self::new(ReservationStatus::Cancelled).with_reason(reason)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Trimmed reason, `None` when blank.
    pub fn normalized_reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// Decide whether `from -> to` is legal and carries what it must.
pub fn check_transition(
    from: ReservationStatus,
    to: ReservationStatus,
    reason: Option<&str>,
) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(ReservationError::InvalidTransition { from, to });
    }
    if to == ReservationStatus::Cancelled && reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(ReservationError::MissingReason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ReservationStatus::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(Requested.allowed_targets(), &[Approved, Cancelled]);
        assert_eq!(Approved.allowed_targets(), &[Completed, Cancelled]);
        assert!(Cancelled.allowed_targets().is_empty());
        assert!(Completed.allowed_targets().is_empty());
    }

    #[test]
    fn test_every_pair_outside_table_is_rejected() {
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let result = check_transition(from, to, Some("reason"));
                if from.can_transition_to(to) {
                    assert_eq!(result, Ok(()), "{} -> {}", from, to);
                } else {
                    assert_eq!(
                        result,
                        Err(ReservationError::InvalidTransition { from, to }),
                        "{} -> {}",
                        from,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_terminal_rejects_repeatedly() {
        for from in [Cancelled, Completed] {
            assert!(from.is_terminal());
            for to in ReservationStatus::ALL {
                for _ in 0..2 {
                    assert!(matches!(
                        check_transition(from, to, Some("again")),
                        Err(ReservationError::InvalidTransition { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn test_cancel_requires_reason() {
        assert_eq!(
            check_transition(Requested, Cancelled, None),
            Err(ReservationError::MissingReason)
        );
        assert_eq!(
            check_transition(Approved, Cancelled, Some("   ")),
            Err(ReservationError::MissingReason)
        );
        assert_eq!(
            check_transition(Requested, Cancelled, Some("schedule conflict")),
            Ok(())
        );
        // Reason is optional elsewhere
        assert_eq!(check_transition(Requested, Approved, None), Ok(()));
    }

    #[test]
    fn test_illegal_target_reported_before_missing_reason() {
        assert_eq!(
            check_transition(Completed, Cancelled, None),
            Err(ReservationError::InvalidTransition {
                from: Completed,
                to: Cancelled
            })
        );
    }

    #[test]
    fn test_editable() {
        assert!(Requested.is_editable());
        assert!(Approved.is_editable());
        assert!(!Cancelled.is_editable());
        assert!(!Completed.is_editable());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Requested.label(Locale::En), "pending");
        assert_eq!(Approved.label(Locale::En), "confirmed");
        assert_eq!(Cancelled.label(Locale::En), "cancelled");
        assert_eq!(Completed.label(Locale::En), "completed");
        assert_eq!(Requested.label(Locale::ZhCn), "待确认");
        assert_eq!(Completed.label(Locale::ZhCn), "已完成");
    }

    #[test]
    fn test_parse_and_serde() {
        for status in ReservationStatus::ALL {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("approved"), None);
        assert_eq!(
            serde_json::to_value(Approved).unwrap(),
            serde_json::json!("Approved")
        );
    }

    #[test]
    fn test_normalized_reason() {
        assert_eq!(
            TransitionRequest::cancel("  plans changed ").normalized_reason(),
            Some("plans changed".to_string())
        );
        assert_eq!(
            TransitionRequest::approve().with_reason(" ").normalized_reason(),
            None
        );
    }

    #[test]
    fn test_request_from_json() {
        let req: TransitionRequest =
            serde_json::from_str(r#"{"status": "Cancelled", "reason": "closed"}"#).unwrap();
        assert_eq!(req, TransitionRequest::cancel("closed"));
        let req: TransitionRequest = serde_json::from_str(r#"{"status": "Approved"}"#).unwrap();
        assert_eq!(req, TransitionRequest::approve());
    }
}
