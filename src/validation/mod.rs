//! Form validation.
//!
//! - `rule` - rule types and the per-field evaluator
//! - `rules` - the restaurant's declared fields and rule sets
//! - `policy` - tunable limits the declared rules are built from
//!
//! # Usage
//!
//! ```rust
//! use reservation_state::validation::{login_rules, BookingPolicy};
//!
//! let rules = login_rules(&BookingPolicy::default());
//! let record = serde_json::json!({ "username": "x", "password": "secret" });
//! let errors = rules.validate(record.as_object().unwrap());
//!
//! assert_eq!(errors.get("username"), Some("Username must be at least 2 characters"));
//! assert!(!errors.contains("password"));
//! ```

pub mod policy;
pub mod rule;
pub mod rules;

pub use policy::BookingPolicy;
pub use rule::{
    Constraint, CustomCheck, FieldContext, FormRecord, RuleSet, ValidationErrors, ValidationRule,
    INVALID_FORMAT_MESSAGE, REQUIRED_MESSAGE,
};
pub use rules::{
    login_rules, parse_arrival_time, parse_table_size, registration_rules, reservation_rules,
};
