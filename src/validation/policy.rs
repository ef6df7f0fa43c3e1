//! Booking policy.
//!
//! The tunable limits behind the declared rule sets. The defaults are the
//! restaurant's house rules; a deployment can override any subset from JSON.

use serde::{Deserialize, Serialize};

/// Limits used to build the declared rule sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingPolicy {
    /// First hour of the day a table can be booked for (inclusive)
    pub opening_hour: u32,

    /// Hour the kitchen stops seating (exclusive)
    pub closing_hour: u32,

    /// Smallest party size
    pub min_table_size: u32,

    /// Largest party size
    pub max_table_size: u32,

    /// Shortest accepted password
    pub min_password_length: usize,

    /// Shortest guest name, counted after trimming
    pub min_name_length: usize,

    /// Longest guest name
    pub max_name_length: usize,

    /// Shortest login username
    pub min_username_length: usize,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            opening_hour: 10,
            closing_hour: 22,
            min_table_size: 1,
            max_table_size: 20,
            min_password_length: 6,
            min_name_length: 2,
            max_name_length: 50,
            min_username_length: 2,
        }
    }
}

impl BookingPolicy {
    /// Load a policy from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if an hour of day falls inside opening hours.
    pub fn is_open_at(&self, hour: u32) -> bool {
        hour >= self.opening_hour && hour < self.closing_hour
    }

    /// Check if a party size is bookable.
    pub fn accepts_table_size(&self, size: u32) -> bool {
        (self.min_table_size..=self.max_table_size).contains(&size)
    }
}
