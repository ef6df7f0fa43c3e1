//! Reservation lifecycle.
//!
//! - `status` - status state machine and history entries
//! - `access` - who may do what to which reservation
//! - `reservation` - a reservation and its guarded mutations
//! - `manager` - indexed in-memory store and staff listings
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       ReservationManager                          │
//! │                                                                   │
//! │   reservation_id → Reservation        user_id → [reservation_id]  │
//! │                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                 Reservation (per booking)                    │  │
//! │  │                                                              │  │
//! │  │  Actor ──authorize──▶ check_transition ──▶ push history      │  │
//! │  │                                                              │  │
//! │  │  Requested ──▶ Approved ──▶ Completed                        │  │
//! │  │      └────────────┴──────▶ Cancelled                         │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod manager;
pub mod reservation;
pub mod status;

pub use access::{Actor, Role};
pub use manager::{Page, ReservationManager, ReservationQuery, SortBy, SortOrder, DEFAULT_PAGE_LIMIT};
pub use reservation::{Reservation, ReservationDetails};
pub use status::{check_transition, Locale, ReservationStatus, StatusHistoryEntry, TransitionRequest};
