//! Declarative field rules and the rule-set evaluator.
//!
//! A [`ValidationRule`] is a `required` flag plus an ordered list of
//! [`Constraint`]s. Evaluation per field:
//!
//! ```text
//! value ──▶ empty? ──yes──▶ required? ──yes──▶ "required" error
//!             │                  └──no───▶ valid
//!             no
//!             ▼
//!   MinLength ─▶ MaxLength ─▶ Pattern      (first failure = generic message)
//!             ▼
//!   Custom ─▶ Custom ─▶ ...                (always run, in insertion order;
//!                                           first non-blank message replaces
//!                                           the generic one)
//! ```
//!
//! Custom predicates are not short-circuited by a generic failure. They run
//! after it and refine its message, so a declared rule can pair a pattern
//! with a field-specific explanation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ReservationError, Result};

/// A flat form submission: field name to raw value.
pub type FormRecord = Map<String, Value>;

/// Message for a missing required field.
pub const REQUIRED_MESSAGE: &str = "This field is required";

/// Message for a failed pattern check.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format";

/// Compiled size limit for anchored patterns.
const PATTERN_SIZE_LIMIT: usize = 64 << 20;

/// What a custom predicate can see besides the field's own value.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// The whole record being validated
    pub record: &'a FormRecord,

    /// Local wall-clock time the validation runs at
    pub now: NaiveDateTime,
}

impl<'a> FieldContext<'a> {
    pub fn new(record: &'a FormRecord, now: NaiveDateTime) -> Self {
        Self { record, now }
    }

    /// Raw value of another field.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.record.get(name)
    }

    /// String representation of another field, if present and non-empty.
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).filter(|v| !is_empty(v)).map(text_of)
    }
}

/// Custom predicate: returns an error message, or `None` when valid.
pub type CustomCheck = Arc<dyn Fn(&Value, &FieldContext<'_>) -> Option<String> + Send + Sync>;

/// A single check applied to a non-empty value.
#[derive(Clone)]
pub enum Constraint {
    /// Minimum length of the string representation, in characters
    MinLength(usize),
    /// Maximum length of the string representation, in characters
    MaxLength(usize),
    /// Full match against the string representation
    Pattern(Regex),
    /// Arbitrary predicate; its message wins over the checks above.
    /// Several may be declared and all are evaluated in order.
    Custom(CustomCheck),
}

impl Constraint {
    /// Evaluation order. Constraints are kept sorted by this.
    fn rank(&self) -> u8 {
        match self {
            Self::MinLength(_) => 0,
            Self::MaxLength(_) => 1,
            Self::Pattern(_) => 2,
            Self::Custom(_) => 3,
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(n) => write!(f, "MinLength({})", n),
            Self::MaxLength(n) => write!(f, "MaxLength({})", n),
            Self::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Rule for one field.
#[derive(Debug, Clone, Default)]
pub struct ValidationRule {
    pub required: bool,
    required_message: Option<String>,
    constraints: Vec<Constraint>,
}

impl ValidationRule {
    /// An optional field with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// A required field with no other checks.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Replace the generic "required" message.
    pub fn with_required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = Some(message.into());
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.with(Constraint::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.with(Constraint::MaxLength(max))
    }

    /// Add a pattern. The regex is anchored so it must match the whole value.
    ///
    /// Anchoring recompiles from the pattern text, so builder options set
    /// outside the pattern (use inline flags such as `(?i)` instead) are not
    /// carried over. If the anchored form cannot be compiled a warning is
    /// logged and the regex is kept as given; use [`Self::try_pattern`] to
    /// get the error instead.
    pub fn pattern(self, regex: Regex) -> Self {
        match anchor(&regex) {
            Ok(anchored) => self.with(Constraint::Pattern(anchored)),
            Err(e) => {
                tracing::warn!(
                    pattern = %regex.as_str(),
                    error = %e,
                    "Could not anchor pattern, matching anywhere in the value"
                );
                self.with(Constraint::Pattern(regex))
            }
        }
    }

    /// Add a pattern, failing if its anchored form does not compile.
    pub fn try_pattern(self, regex: &Regex) -> std::result::Result<Self, regex::Error> {
        Ok(self.with(Constraint::Pattern(anchor(regex)?)))
    }

    pub fn custom<F>(self, check: F) -> Self
    where
        F: Fn(&Value, &FieldContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.with(Constraint::Custom(Arc::new(check)))
    }

    /// Insert a constraint, keeping evaluation order.
    pub fn with(mut self, constraint: Constraint) -> Self {
        let at = self
            .constraints
            .iter()
            .position(|c| c.rank() > constraint.rank())
            .unwrap_or(self.constraints.len());
        self.constraints.insert(at, constraint);
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Check a value, returning the first error message.
    ///
    /// An empty value yields the required message or nothing. Otherwise
    /// length and pattern constraints run in order and the first failure
    /// gives a generic message. Custom predicates then run regardless, in
    /// the order they were added; the first one returning a non-blank
    /// message wins over the generic message. Blank custom messages are
    /// ignored.
    pub fn check(&self, value: Option<&Value>, ctx: &FieldContext<'_>) -> Option<String> {
        let Some(value) = value.filter(|v| !is_empty(v)) else {
            return self.required.then(|| {
                self.required_message
                    .clone()
                    .unwrap_or_else(|| REQUIRED_MESSAGE.to_string())
            });
        };

        let text = text_of(value);
        let length = text.chars().count();
        let mut generic = None;
        let mut customs = Vec::new();

        for constraint in &self.constraints {
            match constraint {
                Constraint::MinLength(min) if generic.is_none() && length < *min => {
                    generic = Some(format!("Must be at least {} characters", min));
                }
                Constraint::MaxLength(max) if generic.is_none() && length > *max => {
                    generic = Some(format!("Must be at most {} characters", max));
                }
                Constraint::Pattern(re) if generic.is_none() && !re.is_match(&text) => {
                    generic = Some(INVALID_FORMAT_MESSAGE.to_string());
                }
                Constraint::Custom(predicate) => customs.push(predicate),
                _ => {}
            }
        }

        customs
            .into_iter()
            .find_map(|predicate| predicate(value, ctx).filter(|m| !m.trim().is_empty()))
            .or(generic)
    }
}

/// Named mapping from field to rule.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, ValidationRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for a field.
    pub fn field(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.get(name)
    }

    /// Field names covered by this set.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Validate against the local wall clock.
    pub fn validate(&self, record: &FormRecord) -> ValidationErrors {
        self.validate_at(record, chrono::Local::now().naive_local())
    }

    /// Validate with an explicit local time.
    pub fn validate_at(&self, record: &FormRecord, now: NaiveDateTime) -> ValidationErrors {
        let ctx = FieldContext::new(record, now);
        let mut errors = ValidationErrors::new();

        for (name, rule) in &self.rules {
            if let Some(message) = rule.check(record.get(name), &ctx) {
                errors.insert(name.clone(), message);
            }
        }

        if !errors.is_empty() {
            tracing::debug!(
                fields = ?errors.fields().collect::<Vec<_>>(),
                "Form validation failed"
            );
        }

        errors
    }
}

/// Field name to first violated message. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok` when empty, otherwise `ValidationFailed` carrying the map.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ReservationError::ValidationFailed(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
        }
        Ok(())
    }
}

fn anchor(regex: &Regex) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\A(?:{})\z", regex.as_str()))
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
}

/// Null, missing, and blank strings count as empty.
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// String representation used by length and pattern checks.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
