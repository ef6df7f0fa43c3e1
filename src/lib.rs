//! Reservation State Library
//!
//! This crate provides the reservation lifecycle and form validation for a
//! restaurant table-booking service.
//!
//! # Overview
//!
//! - **Status State Machine** - `Requested → Approved → Completed`, with
//!   cancellation from either open status. Cancelling requires a reason;
//!   every accepted change is appended to the reservation's history.
//!
//! - **Authorization** - Guests cancel or edit only their own bookings;
//!   employees move any booking through the lifecycle. Caller identity is
//!   passed in explicitly as an [`Actor`].
//!
//! - **Form Validation** - Declarative per-field rules evaluated into a
//!   field → message map, with the restaurant's booking, login and
//!   registration rule sets.
//!
//! # Design Principles
//!
//! 1. **Transitions come from a table** - Legal next statuses are static
//!    data indexed by status.
//!
//! 2. **All or nothing** - A rejected operation leaves the reservation as it was.
//!
//! 3. **No I/O** - This crate is pure state, no HTTP or database.
//!
//! 4. **Serialization-ready** - Domain types serialize to the camelCase
//!    JSON shape clients expect.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Local, Utc};
//! use reservation_state::{ReservationManager, ReservationStatus, Role, TransitionRequest};
//!
//! let mut manager = ReservationManager::new();
//!
//! let arrival = (Local::now().date_naive() + Duration::days(1)).and_hms_opt(18, 0, 0).unwrap();
//! let form = serde_json::json!({
//!     "guestName": "Chen Jie",
//!     "phoneNumber": "13812345678",
//!     "email": "chen@example.com",
//!     "arrivalTime": arrival.format("%Y-%m-%dT%H:%M").to_string(),
//!     "tableSize": 4,
//! });
//!
//! let guest = manager.actor_for("user-1", Role::Guest);
//! let id = manager
//!     .create(&guest, form.as_object().unwrap(), Utc::now())
//!     .unwrap()
//!     .id
//!     .clone();
//!
//! let staff = manager.actor_for("staff-1", Role::Employee);
//! let res = manager
//!     .update_status(&staff, &id, &TransitionRequest::approve(), Utc::now())
//!     .unwrap();
//! assert_eq!(res.status(), ReservationStatus::Approved);
//! assert_eq!(res.history().len(), 2);
//! ```

pub mod error;
pub mod state;
pub mod validation;

pub use error::{ReservationError, Result};
pub use state::*;
pub use validation::{BookingPolicy, RuleSet, ValidationErrors, ValidationRule};
