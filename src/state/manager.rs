//! Reservation store.
//!
//! In-memory indexed storage for reservations, standing in for the
//! persistence service. Every mutation is serialized through `&mut self`;
//! callers that read, think, then write can use
//! [`ReservationManager::update_status_if_version`] to detect that someone
//! else got there first.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::{Actor, Role};
use super::reservation::{Reservation, ReservationDetails};
use super::status::{ReservationStatus, StatusHistoryEntry, TransitionRequest};
use crate::error::{ReservationError, Result};
use crate::validation::{reservation_rules, BookingPolicy, FormRecord, RuleSet};

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Column to order a listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    ArrivalTime,
    GuestName,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Staff listing filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    /// Earliest arrival time, inclusive
    pub start: Option<NaiveDateTime>,
    /// Latest arrival time, inclusive
    pub end: Option<NaiveDateTime>,
    /// Case-insensitive match on guest name, phone or email
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// 1-indexed
    pub page: usize,
    pub limit: usize,
}

impl Default for ReservationQuery {
    fn default() -> Self {
        Self {
            status: None,
            start: None,
            end: None,
            search: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ReservationQuery {
    fn matches(&self, reservation: &Reservation) -> bool {
        let details = reservation.details();
        if self.status.is_some_and(|s| s != reservation.status()) {
            return false;
        }
        if self.start.is_some_and(|start| details.arrival_time < start) {
            return false;
        }
        if self.end.is_some_and(|end| details.arrival_time > end) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                [&details.guest_name, &details.phone_number, &details.email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    fn compare(&self, a: &Reservation, b: &Reservation) -> Ordering {
        let ordering = match self.sort_by {
            SortBy::ArrivalTime => a.details().arrival_time.cmp(&b.details().arrival_time),
            SortBy::GuestName => a
                .details()
                .guest_name
                .to_lowercase()
                .cmp(&b.details().guest_name.to_lowercase()),
            SortBy::Status => a.status().cmp(&b.status()),
        }
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id));

        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Reservation manager - tracks all reservations.
#[derive(Debug)]
pub struct ReservationManager {
    /// Reservations by ID
    reservations: HashMap<String, Reservation>,

    /// User ID to owned reservation IDs, in creation order
    user_index: HashMap<String, Vec<String>>,

    rules: RuleSet,
}

impl Default for ReservationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationManager {
    pub fn new() -> Self {
        Self::with_policy(&BookingPolicy::default())
    }

    pub fn with_policy(policy: &BookingPolicy) -> Self {
        Self {
            reservations: HashMap::new(),
            user_index: HashMap::new(),
            rules: reservation_rules(policy),
        }
    }

    /// Build the caller context for a user, including owned reservations.
    pub fn actor_for(&self, user_id: &str, role: Role) -> Actor {
        match role {
            Role::Employee => Actor::employee(user_id),
            Role::Guest => Actor::guest(
                user_id,
                self.user_index.get(user_id).cloned().unwrap_or_default(),
            ),
        }
    }

    /// Validate a booking form and store a new `Requested` reservation.
    pub fn create(
        &mut self,
        actor: &Actor,
        record: &FormRecord,
        now: DateTime<Utc>,
    ) -> Result<&Reservation> {
        actor.authorize_create()?;
        let details = ReservationDetails::from_record(record, &self.rules, local_time(now))?;

        let id = uuid::Uuid::new_v4().to_string();
        let reservation = Reservation::new(id.clone(), actor.user_id.clone(), details, now);

        tracing::info!(
            reservation_id = %id,
            user_id = %actor.user_id,
            table_size = reservation.details().table_size,
            arrival_time = %reservation.details().arrival_time,
            "Reservation requested"
        );

        self.user_index
            .entry(actor.user_id.clone())
            .or_default()
            .push(id.clone());
        Ok(&*self.reservations.entry(id).or_insert(reservation))
    }

    /// Get reservation by ID.
    pub fn get(&self, reservation_id: &str) -> Option<&Reservation> {
        self.reservations.get(reservation_id)
    }

    /// Get a reservation the caller is allowed to see.
    pub fn get_for(&self, actor: &Actor, reservation_id: &str) -> Result<&Reservation> {
        let reservation = self.find(reservation_id)?;
        if !actor.can_view(reservation) {
            return Err(ReservationError::Unauthorized("view another guest's reservation"));
        }
        Ok(reservation)
    }

    /// A user's reservations, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Vec<&Reservation> {
        self.user_index
            .get(user_id)
            .into_iter()
            .flatten()
            .rev()
            .filter_map(|id| self.reservations.get(id))
            .collect()
    }

    /// Filtered, sorted, paginated listing of all reservations.
    pub fn query(&self, query: &ReservationQuery) -> Page<&Reservation> {
        let mut matched: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|r| query.matches(r))
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let limit = query.limit.max(1);
        let page = query.page.max(1);
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Page {
            items,
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }

    /// Validate a booking form and replace the reservation's details.
    pub fn update_details(
        &mut self,
        actor: &Actor,
        reservation_id: &str,
        record: &FormRecord,
        now: DateTime<Utc>,
    ) -> Result<&Reservation> {
        actor.authorize_edit(self.find(reservation_id)?)?;
        let details = ReservationDetails::from_record(record, &self.rules, local_time(now))?;

        let reservation = self.find_mut(reservation_id)?;
        reservation.update_details(actor, details, now)?;
        Ok(&*reservation)
    }

    /// Apply a status change against the current stored status.
    pub fn update_status(
        &mut self,
        actor: &Actor,
        reservation_id: &str,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<&Reservation> {
        let reservation = self.find_mut(reservation_id)?;
        reservation.transition(actor, request, now)?;
        Ok(&*reservation)
    }

    /// Apply a status change only if nobody modified the reservation since
    /// `expected_version` was read.
    pub fn update_status_if_version(
        &mut self,
        actor: &Actor,
        reservation_id: &str,
        expected_version: u64,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<&Reservation> {
        let reservation = self.find_mut(reservation_id)?;
        if reservation.version() != expected_version {
            tracing::warn!(
                reservation_id,
                expected_version,
                actual_version = reservation.version(),
                "Stale status update rejected"
            );
            return Err(ReservationError::VersionConflict {
                expected: expected_version,
                actual: reservation.version(),
            });
        }
        reservation.transition(actor, request, now)?;
        Ok(&*reservation)
    }

    /// Guest self-service cancellation.
    pub fn cancel(
        &mut self,
        actor: &Actor,
        reservation_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<&Reservation> {
        self.update_status(actor, reservation_id, &TransitionRequest::cancel(reason), now)
    }

    /// Status history of a reservation.
    pub fn history(&self, reservation_id: &str) -> Result<&[StatusHistoryEntry]> {
        Ok(self.find(reservation_id)?.history())
    }

    /// Count reservations.
    pub fn count(&self) -> usize {
        self.reservations.len()
    }

    /// Count reservations in a status.
    pub fn count_by_status(&self, status: ReservationStatus) -> usize {
        self.reservations
            .values()
            .filter(|r| r.status() == status)
            .count()
    }

    fn find(&self, reservation_id: &str) -> Result<&Reservation> {
        self.reservations
            .get(reservation_id)
            .ok_or_else(|| ReservationError::NotFound(reservation_id.to_string()))
    }

    fn find_mut(&mut self, reservation_id: &str) -> Result<&mut Reservation> {
        self.reservations
            .get_mut(reservation_id)
            .ok_or_else(|| ReservationError::NotFound(reservation_id.to_string()))
    }
}

/// Wall-clock time at the restaurant.
fn local_time(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&Local).naive_local()
}
