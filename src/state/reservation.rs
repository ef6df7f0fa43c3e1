//! A single reservation and the operations that mutate it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::Actor;
use super::status::{check_transition, ReservationStatus, StatusHistoryEntry, TransitionRequest};
use crate::error::{ReservationError, Result};
use crate::validation::rule::{is_empty, text_of};
use crate::validation::rules::{
    parse_arrival_time, parse_table_size, ARRIVAL_TIME, EMAIL, GUEST_NAME, PHONE_NUMBER,
    SPECIAL_REQUESTS, TABLE_SIZE,
};
use crate::validation::{FormRecord, RuleSet, ValidationErrors, REQUIRED_MESSAGE};

/// Contact and booking fields a guest fills in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    pub guest_name: String,
    pub phone_number: String,
    pub email: String,
    /// Local wall-clock time at the restaurant
    pub arrival_time: NaiveDateTime,
    pub table_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl ReservationDetails {
    /// Validate a submitted form and parse it.
    pub fn from_record(record: &FormRecord, rules: &RuleSet, now: NaiveDateTime) -> Result<Self> {
        rules.validate_at(record, now).into_result()?;
        Self::parse(record)
    }

    /// Parse an already validated form.
    fn parse(record: &FormRecord) -> Result<Self> {
        let arrival = required_text(record, ARRIVAL_TIME)?;
        let size = record.get(TABLE_SIZE).and_then(parse_table_size);

        Ok(Self {
            guest_name: required_text(record, GUEST_NAME)?.trim().to_string(),
            phone_number: required_text(record, PHONE_NUMBER)?.trim().to_string(),
            email: required_text(record, EMAIL)?.trim().to_string(),
            arrival_time: parse_arrival_time(&arrival)
                .ok_or_else(|| field_error(ARRIVAL_TIME, "Please enter a valid arrival time"))?,
            table_size: size.ok_or_else(|| field_error(TABLE_SIZE, "Invalid table size"))?,
            special_requests: record
                .get(SPECIAL_REQUESTS)
                .filter(|v| !is_empty(v))
                .map(|v| text_of(v).trim().to_string()),
        })
    }
}

fn required_text(record: &FormRecord, field: &str) -> Result<String> {
    record
        .get(field)
        .filter(|v| !is_empty(v))
        .map(text_of)
        .ok_or_else(|| field_error(field, REQUIRED_MESSAGE))
}

fn field_error(field: &str, message: &str) -> ReservationError {
    let mut errors = ValidationErrors::new();
    errors.insert(field, message);
    ReservationError::ValidationFailed(errors)
}

/// Reservation record.
///
/// Status only changes through [`Reservation::transition`], which keeps
/// `status` equal to the last history entry. Deserialization goes through
/// the same checks: the history must start at `Requested`, follow the
/// transition table, and end at `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredReservation")]
pub struct Reservation {
    /// Opaque reservation id
    pub id: String,

    /// Owning guest's user id
    pub user_id: String,

    #[serde(flatten)]
    pub(crate) details: ReservationDetails,

    pub(crate) status: ReservationStatus,

    /// Append-only, oldest first
    pub(crate) status_history: Vec<StatusHistoryEntry>,

    pub created_at: DateTime<Utc>,

    pub(crate) updated_at: DateTime<Utc>,

    /// Bumped on every accepted mutation
    pub(crate) version: u64,
}

/// Wire shape of [`Reservation`] before its history is checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReservation {
    id: String,
    user_id: String,
    #[serde(flatten)]
    details: ReservationDetails,
    status: ReservationStatus,
    status_history: Vec<StatusHistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl TryFrom<StoredReservation> for Reservation {
    type Error = String;

    fn try_from(stored: StoredReservation) -> std::result::Result<Self, Self::Error> {
        let Some(first) = stored.status_history.first() else {
            return Err(format!("reservation {} has an empty status history", stored.id));
        };
        if first.status != ReservationStatus::Requested {
            return Err(format!(
                "reservation {} history starts at {:?}, not Requested",
                stored.id, first.status
            ));
        }
        if let Some(pair) = stored
            .status_history
            .windows(2)
            .find(|pair| !pair[0].status.can_transition_to(pair[1].status))
        {
            return Err(format!(
                "reservation {} history has illegal step {:?} -> {:?}",
                stored.id, pair[0].status, pair[1].status
            ));
        }
        let last = stored.status_history.last().map(|entry| entry.status);
        if last != Some(stored.status) {
            return Err(format!(
                "reservation {} status {:?} does not match its last history entry",
                stored.id, stored.status
            ));
        }

        Ok(Self {
            id: stored.id,
            user_id: stored.user_id,
            details: stored.details,
            status: stored.status,
            status_history: stored.status_history,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            version: stored.version,
        })
    }
}

impl Reservation {
    /// Create a new reservation in `Requested` with a single history entry.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        details: ReservationDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            details,
            status: ReservationStatus::Requested,
            status_history: vec![StatusHistoryEntry {
                status: ReservationStatus::Requested,
                timestamp: now,
                reason: None,
            }],
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn details(&self) -> &ReservationDetails {
        &self.details
    }

    pub fn history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status change, returning the new history entry.
    ///
    /// Checks, in order: caller authorization, the transition table, and
    /// the cancellation reason. Nothing changes unless all pass.
    pub fn transition(
        &mut self,
        actor: &Actor,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<&StatusHistoryEntry> {
        let reason = request.normalized_reason();
        actor
            .authorize_transition(self, request)
            .and_then(|()| check_transition(self.status, request.status, reason.as_deref()))
            .inspect_err(|e| {
                tracing::debug!(
                    reservation_id = %self.id,
                    actor = %actor.user_id,
                    from = %self.status,
                    to = %request.status,
                    error = %e,
                    "Status change rejected"
                );
            })?;

        let from = self.status;
        self.status = request.status;
        self.updated_at = now;
        self.version += 1;
        self.status_history.push(StatusHistoryEntry {
            status: request.status,
            timestamp: now,
            reason,
        });

        tracing::info!(
            reservation_id = %self.id,
            actor = %actor.user_id,
            %from,
            to = %self.status,
            version = self.version,
            "Reservation status changed"
        );

        Ok(&self.status_history[self.status_history.len() - 1])
    }

    /// Replace the guest-editable fields.
    pub fn update_details(
        &mut self,
        actor: &Actor,
        details: ReservationDetails,
        now: DateTime<Utc>,
    ) -> Result<()> {
        actor.authorize_edit(self).inspect_err(|e| {
            tracing::debug!(
                reservation_id = %self.id,
                actor = %actor.user_id,
                status = %self.status,
                error = %e,
                "Edit rejected"
            );
        })?;

        self.details = details;
        self.updated_at = now;
        self.version += 1;

        tracing::debug!(reservation_id = %self.id, version = self.version, "Reservation details updated");
        Ok(())
    }
}
