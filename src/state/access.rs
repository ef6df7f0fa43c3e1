//! Caller identity and authorization.
//!
//! An [`Actor`] is passed explicitly into every operation that needs it.
//! Identity is established elsewhere; this module only decides what an
//! already-identified caller may do.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::reservation::Reservation;
use super::status::{ReservationStatus, TransitionRequest};
use crate::error::{ReservationError, Result};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Employee,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    /// Reservation ids this caller owns (guests only)
    owned: HashSet<String>,
}

impl Actor {
    pub fn guest(user_id: impl Into<String>, owned: impl IntoIterator<Item = String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Guest,
            owned: owned.into_iter().collect(),
        }
    }

    pub fn employee(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Employee,
            owned: HashSet::new(),
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Check if this caller owns a reservation.
    pub fn owns(&self, reservation_id: &str) -> bool {
        self.owned.contains(reservation_id)
    }

    /// Record ownership of a newly created reservation.
    pub fn grant(&mut self, reservation_id: impl Into<String>) {
        self.owned.insert(reservation_id.into());
    }

    /// Employees may request any transition; guests only cancel their own.
    ///
    /// Whether the transition is legal from the current status is decided
    /// separately.
    pub fn authorize_transition(
        &self,
        reservation: &Reservation,
        request: &TransitionRequest,
    ) -> Result<()> {
        match self.role {
            Role::Employee => Ok(()),
            Role::Guest if !self.owns(&reservation.id) => Err(ReservationError::Unauthorized(
                "change another guest's reservation",
            )),
            Role::Guest if request.status != ReservationStatus::Cancelled => Err(
                ReservationError::Unauthorized("change reservation status"),
            ),
            Role::Guest => Ok(()),
        }
    }

    /// Only the owning guest edits details, and only while pending or confirmed.
    pub fn authorize_edit(&self, reservation: &Reservation) -> Result<()> {
        if self.role != Role::Guest {
            return Err(ReservationError::Unauthorized("edit guest details"));
        }
        if !self.owns(&reservation.id) {
            return Err(ReservationError::Unauthorized(
                "edit another guest's reservation",
            ));
        }
        if !reservation.status.is_editable() {
            return Err(ReservationError::Unauthorized(
                "edit a cancelled or completed reservation",
            ));
        }
        Ok(())
    }

    /// Only guests book tables.
    pub fn authorize_create(&self) -> Result<()> {
        match self.role {
            Role::Guest => Ok(()),
            Role::Employee => Err(ReservationError::Unauthorized("create reservations")),
        }
    }

    /// Guests see their own reservations; employees see all.
    pub fn can_view(&self, reservation: &Reservation) -> bool {
        self.is_employee() || self.owns(&reservation.id)
    }

    /// Statuses this caller could move the reservation to right now.
    pub fn available_transitions(&self, reservation: &Reservation) -> Vec<ReservationStatus> {
        let targets = reservation.status.allowed_targets();
        match self.role {
            Role::Employee => targets.to_vec(),
            Role::Guest if self.owns(&reservation.id) => targets
                .iter()
                .copied()
                .filter(|s| *s == ReservationStatus::Cancelled)
                .collect(),
            Role::Guest => Vec::new(),
        }
    }

    pub fn can_edit(&self, reservation: &Reservation) -> bool {
        self.authorize_edit(reservation).is_ok()
    }

    pub fn can_cancel(&self, reservation: &Reservation) -> bool {
        self.available_transitions(reservation)
            .contains(&ReservationStatus::Cancelled)
    }
}
