//! Common validation utilities.

use chrono::NaiveDate;
use validator::{ValidateEmail, ValidationError};

/// Maximum length of an event location.
pub const MAX_LOCATION_LENGTH: usize = 255;

lazy_static::lazy_static! {
    /// 24h `HH:MM`.
    pub static ref TIME_OF_DAY_REGEX: regex::Regex =
        regex::Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();

    /// Lower-case URL-safe slug, e.g. `tech-talks`.
    pub static ref SLUG_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Normalizes an email address for storage and duplicate detection.
///
/// Addresses are compared case-insensitively over the whole address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns true when the address has valid email syntax.
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Validates a 24h `HH:MM` time of day.
pub fn validate_time_of_day(time: &str) -> Result<(), ValidationError> {
    if TIME_OF_DAY_REGEX.is_match(time) {
        Ok(())
    } else {
        let mut err = ValidationError::new("time_format");
        err.message = Some("Time must be in HH:MM format".into());
        Err(err)
    }
}

/// Validates an ISO calendar date (`YYYY-MM-DD`).
pub fn validate_calendar_date(date: &str) -> Result<(), ValidationError> {
    parse_calendar_date(date).map(|_| ()).ok_or_else(|| {
        let mut err = ValidationError::new("date_format");
        err.message = Some("Date must be in YYYY-MM-DD format".into());
        err
    })
}

/// Parses an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_calendar_date(date: &str) -> Option<NaiveDate> {
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Validates a category slug.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message =
            Some("Slug may only contain lowercase letters, digits and single dashes".into());
        Err(err)
    }
}

/// Validates that a location fits the stored column.
pub fn validate_location(location: &str) -> Result<(), ValidationError> {
    if location.chars().count() <= MAX_LOCATION_LENGTH {
        Ok(())
    } else {
        let mut err = ValidationError::new("location_length");
        err.message = Some("Location must be at most 255 characters".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("bob@x.com"), "bob@x.com");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_validate_time_of_day() {
        assert!(validate_time_of_day("00:00").is_ok());
        assert!(validate_time_of_day("09:30").is_ok());
        assert!(validate_time_of_day("23:59").is_ok());
        assert!(validate_time_of_day("24:00").is_err());
        assert!(validate_time_of_day("9:30").is_err());
        assert!(validate_time_of_day("12:60").is_err());
        assert!(validate_time_of_day("noon").is_err());
    }

    #[test]
    fn test_validate_time_error_message() {
        let err = validate_time_of_day("7pm").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Time must be in HH:MM format"
        );
    }

    #[test]
    fn test_validate_calendar_date() {
        assert!(validate_calendar_date("2026-01-31").is_ok());
        assert!(validate_calendar_date("2024-02-29").is_ok());
        assert!(validate_calendar_date("2026-02-30").is_err());
        assert!(validate_calendar_date("2026-1-5").is_err());
        assert!(validate_calendar_date("31/01/2026").is_err());
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(
            parse_calendar_date("2026-01-15"),
            NaiveDate::from_ymd_opt(2026, 1, 15)
        );
        assert_eq!(parse_calendar_date("2026-01-15T00:00"), None);
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("music").is_ok());
        assert!(validate_slug("tech-talks-2026").is_ok());
        assert!(validate_slug("Tech").is_err());
        assert!(validate_slug("-music").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_validate_location() {
        assert!(validate_location("Main Hall").is_ok());
        assert!(validate_location(&"x".repeat(255)).is_ok());
        assert!(validate_location(&"x".repeat(256)).is_err());
    }
}
