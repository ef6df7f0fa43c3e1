//! Declared field rules and the form rule sets built from them.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use regex::Regex;
use serde_json::Value;

use super::policy::BookingPolicy;
use super::rule::{text_of, RuleSet, ValidationRule};

pub const GUEST_NAME: &str = "guestName";
pub const PHONE_NUMBER: &str = "phoneNumber";
pub const EMAIL: &str = "email";
pub const ARRIVAL_TIME: &str = "arrivalTime";
pub const TABLE_SIZE: &str = "tableSize";
pub const SPECIAL_REQUESTS: &str = "specialRequests";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const CONFIRM_PASSWORD: &str = "confirmPassword";

/// local@domain.tld with no whitespace and a single `@`.
pub static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// 11-digit mobile number: `1`, then 3-9, then nine digits.
pub static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("valid phone regex"));

const ARRIVAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an arrival time into local wall-clock time.
///
/// RFC 3339 values are converted to the local zone; `datetime-local` style
/// values without an offset are taken as local already.
pub fn parse_arrival_time(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ARRIVAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

/// Parse a party size from a JSON number or numeric string.
///
/// Fractional and negative values yield `None`.
pub fn parse_table_size(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() || n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as u32)
}

fn is_email(s: &str) -> bool {
    EMAIL_PATTERN.is_match(s)
}

pub fn email() -> ValidationRule {
    ValidationRule::required()
        .pattern(EMAIL_PATTERN.clone())
        .custom(|v, _| (!is_email(&text_of(v))).then(|| "Please enter a valid email address".to_string()))
}

pub fn password(policy: &BookingPolicy) -> ValidationRule {
    let min = policy.min_password_length;
    ValidationRule::required().min_length(min).custom(move |v, _| {
        (text_of(v).chars().count() < min)
            .then(|| format!("Password must be at least {} characters", min))
    })
}

pub fn phone() -> ValidationRule {
    ValidationRule::required()
        .pattern(PHONE_PATTERN.clone())
        .custom(|v, _| {
            (!PHONE_PATTERN.is_match(&text_of(v)))
                .then(|| "Please enter a valid mobile number".to_string())
        })
}

/// Length limits apply to the trimmed name, which is what gets stored.
pub fn name(policy: &BookingPolicy) -> ValidationRule {
    let (min, max) = (policy.min_name_length, policy.max_name_length);
    ValidationRule::required().custom(move |v, _| {
        let length = text_of(v).trim().chars().count();
        if length < min {
            Some(format!("Name must be at least {} characters", min))
        } else if length > max {
            Some(format!("Name must be at most {} characters", max))
        } else {
            None
        }
    })
}

pub fn table_size(policy: &BookingPolicy) -> ValidationRule {
    let policy = policy.clone();
    ValidationRule::required().custom(move |v, _| {
        match parse_table_size(v) {
            Some(size) if policy.accepts_table_size(size) => None,
            _ => Some(format!(
                "Table size must be between {} and {}",
                policy.min_table_size, policy.max_table_size
            )),
        }
    })
}

pub fn arrival_time(policy: &BookingPolicy) -> ValidationRule {
    let policy = policy.clone();
    ValidationRule::required()
        .with_required_message("Please choose an arrival time")
        .custom(move |v, ctx| {
            let Some(arrival) = v.as_str().and_then(parse_arrival_time) else {
                return Some("Please enter a valid arrival time".to_string());
            };
            if arrival <= ctx.now {
                return Some("Arrival time must be later than the current time".to_string());
            }
            if !policy.is_open_at(arrival.hour()) {
                return Some(format!(
                    "Please choose a time within opening hours ({:02}:00-{:02}:00)",
                    policy.opening_hour, policy.closing_hour
                ));
            }
            None
        })
}

/// Login identifier: an email when it contains `@`, otherwise a username.
pub fn username_or_email(policy: &BookingPolicy) -> ValidationRule {
    let min = policy.min_username_length;
    ValidationRule::required()
        .with_required_message("Please enter a username or email address")
        .custom(move |v, _| {
            let s = text_of(v);
            if s.contains('@') {
                (!is_email(&s)).then(|| "Please enter a valid email address".to_string())
            } else {
                (s.trim().chars().count() < min)
                    .then(|| format!("Username must be at least {} characters", min))
            }
        })
}

pub fn username(policy: &BookingPolicy) -> ValidationRule {
    let min = policy.min_username_length;
    ValidationRule::required().min_length(min).custom(move |v, _| {
        (text_of(v).trim().chars().count() < min)
            .then(|| format!("Username must be at least {} characters", min))
    })
}

/// Must equal the `password` field of the same record.
pub fn confirm_password() -> ValidationRule {
    ValidationRule::required()
        .with_required_message("Please confirm your password")
        .custom(|v, ctx| {
            (ctx.text(PASSWORD) != Some(text_of(v)))
                .then(|| "Passwords do not match".to_string())
        })
}

/// Creating or editing a reservation.
pub fn reservation_rules(policy: &BookingPolicy) -> RuleSet {
    RuleSet::new()
        .field(GUEST_NAME, name(policy))
        .field(EMAIL, email())
        .field(PHONE_NUMBER, phone())
        .field(ARRIVAL_TIME, arrival_time(policy))
        .field(TABLE_SIZE, table_size(policy))
}

/// Signing in with a username or email.
pub fn login_rules(policy: &BookingPolicy) -> RuleSet {
    RuleSet::new()
        .field(USERNAME, username_or_email(policy))
        .field(PASSWORD, password(policy))
}

/// Creating an account.
pub fn registration_rules(policy: &BookingPolicy) -> RuleSet {
    RuleSet::new()
        .field(USERNAME, username(policy))
        .field(EMAIL, email())
        .field(PASSWORD, password(policy))
        .field(CONFIRM_PASSWORD, confirm_password())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rule::{FormRecord, REQUIRED_MESSAGE};
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 20)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    fn check(rule: &ValidationRule, value: Value) -> Option<String> {
        let mut rec = FormRecord::new();
        rec.insert("f".to_string(), value);
        let ctx = crate::validation::FieldContext::new(&rec, now());
        rule.check(rec.get("f"), &ctx)
    }

    fn local(dt: NaiveDateTime) -> String {
        dt.format("%Y-%m-%dT%H:%M").to_string()
    }

    #[test]
    fn test_email() {
        let rule = email();
        assert_eq!(check(&rule, json!("guest@example.com")), None);
        assert_eq!(
            check(&rule, json!("guest@example")),
            Some("Please enter a valid email address".to_string())
        );
        assert_eq!(
            check(&rule, json!("a b@example.com")),
            Some("Please enter a valid email address".to_string())
        );
        assert_eq!(check(&rule, json!("")), Some(REQUIRED_MESSAGE.to_string()));
    }

    #[test]
    fn test_password() {
        let rule = password(&BookingPolicy::default());
        assert_eq!(check(&rule, json!("secret")), None);
        assert_eq!(
            check(&rule, json!("12345")),
            Some("Password must be at least 6 characters".to_string())
        );
    }

    #[test]
    fn test_phone() {
        let rule = phone();
        assert_eq!(check(&rule, json!("13812345678")), None);
        assert_eq!(check(&rule, json!("19912345678")), None);
        let invalid = Some("Please enter a valid mobile number".to_string());
        assert_eq!(check(&rule, json!("12812345678")), invalid);
        assert_eq!(check(&rule, json!("1381234567")), invalid);
        assert_eq!(check(&rule, json!("138123456789")), invalid);
        assert_eq!(check(&rule, json!("23812345678")), invalid);
    }

    #[test]
    fn test_name() {
        let rule = name(&BookingPolicy::default());
        assert_eq!(check(&rule, json!("Li Lei")), None);
        assert_eq!(
            check(&rule, json!("A")),
            Some("Name must be at least 2 characters".to_string())
        );
        // Padding does not count
        assert_eq!(
            check(&rule, json!("  A  ")),
            Some("Name must be at least 2 characters".to_string())
        );
        assert_eq!(
            check(&rule, json!("x".repeat(51))),
            Some("Name must be at most 50 characters".to_string())
        );
        assert_eq!(check(&rule, json!("x".repeat(50))), None);
    }

    #[test]
    fn test_name_limits_ignore_padding() {
        let rule = name(&BookingPolicy::default());
        assert_eq!(check(&rule, json!("x".repeat(50) + " ")), None);
        assert_eq!(check(&rule, json!(format!("  {}  ", "x".repeat(50)))), None);
        assert_eq!(
            check(&rule, json!(format!(" {} ", "x".repeat(51)))),
            Some("Name must be at most 50 characters".to_string())
        );
    }

    #[test]
    fn test_table_size() {
        let rule = table_size(&BookingPolicy::default());
        let invalid = Some("Table size must be between 1 and 20".to_string());
        assert_eq!(check(&rule, json!(0)), invalid);
        assert_eq!(check(&rule, json!(1)), None);
        assert_eq!(check(&rule, json!(20)), None);
        assert_eq!(check(&rule, json!(21)), invalid);
        assert_eq!(check(&rule, json!("4")), None);
        assert_eq!(check(&rule, json!("four")), invalid);
        assert_eq!(check(&rule, json!(2.5)), invalid);
        assert_eq!(check(&rule, json!(-3)), invalid);
        assert_eq!(check(&rule, json!(null)), Some(REQUIRED_MESSAGE.to_string()));
    }

    #[test]
    fn test_arrival_time() {
        let rule = arrival_time(&BookingPolicy::default());
        let today = now().date();
        let tomorrow = today + Duration::days(1);

        let yesterday = (today - Duration::days(1)).and_hms_opt(14, 0, 0).unwrap();
        assert_eq!(
            check(&rule, json!(local(yesterday))),
            Some("Arrival time must be later than the current time".to_string())
        );

        let late_tonight = today.and_hms_opt(23, 0, 0).unwrap();
        assert_eq!(
            check(&rule, json!(local(late_tonight))),
            Some("Please choose a time within opening hours (10:00-22:00)".to_string())
        );

        let lunch_tomorrow = tomorrow.and_hms_opt(14, 0, 0).unwrap();
        assert_eq!(check(&rule, json!(local(lunch_tomorrow))), None);
    }

    #[test]
    fn test_arrival_time_hour_boundaries() {
        let rule = arrival_time(&BookingPolicy::default());
        let tomorrow = now().date() + Duration::days(1);
        let at = |h, m| json!(local(tomorrow.and_hms_opt(h, m, 0).unwrap()));

        assert!(check(&rule, at(9, 59)).is_some());
        assert_eq!(check(&rule, at(10, 0)), None);
        assert_eq!(check(&rule, at(21, 59)), None);
        assert!(check(&rule, at(22, 0)).is_some());
    }

    #[test]
    fn test_arrival_time_unparseable() {
        let rule = arrival_time(&BookingPolicy::default());
        assert_eq!(
            check(&rule, json!("next tuesday")),
            Some("Please enter a valid arrival time".to_string())
        );
        assert_eq!(
            check(&rule, json!("")),
            Some("Please choose an arrival time".to_string())
        );
    }

    #[test]
    fn test_parse_arrival_time_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 5, 21)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(parse_arrival_time("2026-05-21T18:00"), Some(expected));
        assert_eq!(parse_arrival_time("2026-05-21T18:00:00"), Some(expected));
        assert_eq!(parse_arrival_time("2026-05-21 18:00"), Some(expected));
        assert!(parse_arrival_time("2026-05-21T18:00:00Z").is_some());
        assert_eq!(parse_arrival_time("21/05/2026"), None);
    }

    #[test]
    fn test_username_or_email() {
        let rule = username_or_email(&BookingPolicy::default());
        assert_eq!(check(&rule, json!("li")), None);
        assert_eq!(check(&rule, json!("li@example.com")), None);
        assert_eq!(
            check(&rule, json!("l")),
            Some("Username must be at least 2 characters".to_string())
        );
        assert_eq!(
            check(&rule, json!("li@example")),
            Some("Please enter a valid email address".to_string())
        );
        assert_eq!(
            check(&rule, json!(" ")),
            Some("Please enter a username or email address".to_string())
        );
    }

    #[test]
    fn test_reservation_rules() {
        let rules = reservation_rules(&BookingPolicy::default());
        let tomorrow = now().date() + Duration::days(1);
        let record = json!({
            "guestName": "Wang Fang",
            "phoneNumber": "13812345678",
            "email": "wang@example.com",
            "arrivalTime": local(tomorrow.and_hms_opt(18, 0, 0).unwrap()),
            "tableSize": 4,
        });
        let errors = rules.validate_at(record.as_object().unwrap(), now());
        assert!(errors.is_empty(), "unexpected errors: {}", errors);

        let errors = rules.validate_at(&FormRecord::new(), now());
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec![ARRIVAL_TIME, EMAIL, GUEST_NAME, PHONE_NUMBER, TABLE_SIZE]
        );
    }

    #[test]
    fn test_login_rules() {
        let rules = login_rules(&BookingPolicy::default());
        let ok = json!({ "username": "staff01", "password": "hunter22" });
        assert!(rules.validate_at(ok.as_object().unwrap(), now()).is_empty());

        let bad = json!({ "username": "s", "password": "123" });
        let errors = rules.validate_at(bad.as_object().unwrap(), now());
        assert_eq!(errors.get(USERNAME), Some("Username must be at least 2 characters"));
        assert_eq!(errors.get(PASSWORD), Some("Password must be at least 6 characters"));
    }

    #[test]
    fn test_registration_rules() {
        let rules = registration_rules(&BookingPolicy::default());
        let ok = json!({
            "username": "wangfang",
            "email": "wang@example.com",
            "password": "secret1",
            "confirmPassword": "secret1",
        });
        assert!(rules.validate_at(ok.as_object().unwrap(), now()).is_empty());

        let mismatch = json!({
            "username": "w",
            "email": "wang@example.com",
            "password": "secret1",
            "confirmPassword": "secret2",
        });
        let errors = rules.validate_at(mismatch.as_object().unwrap(), now());
        assert_eq!(errors.get(USERNAME), Some("Username must be at least 2 characters"));
        assert_eq!(errors.get(CONFIRM_PASSWORD), Some("Passwords do not match"));
        assert_eq!(errors.len(), 2);

        let unconfirmed = json!({
            "username": "wangfang",
            "email": "wang@example.com",
            "password": "secret1",
        });
        let errors = rules.validate_at(unconfirmed.as_object().unwrap(), now());
        assert_eq!(errors.get(CONFIRM_PASSWORD), Some("Please confirm your password"));
    }

    #[test]
    fn test_policy_drives_rules() {
        let policy = BookingPolicy {
            opening_hour: 17,
            max_table_size: 8,
            ..BookingPolicy::default()
        };
        let size = table_size(&policy);
        assert_eq!(
            check(&size, json!(10)),
            Some("Table size must be between 1 and 8".to_string())
        );

        let arrival = arrival_time(&policy);
        let tomorrow = now().date() + Duration::days(1);
        assert_eq!(
            check(&arrival, json!(local(tomorrow.and_hms_opt(14, 0, 0).unwrap()))),
            Some("Please choose a time within opening hours (17:00-22:00)".to_string())
        );
    }
}
