//! Helpers for turning raw request fields into domain values.
//!
//! Request bodies are deserialized into plain strings first and checked here
//! so that a bad field is reported as [Error::Validation] naming the field,
//! rather than as an opaque deserialization failure.

use email_address::EmailAddress;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Trim `value` and reject it if nothing is left.
///
/// # Errors
/// Returns [Error::Validation] if `value` is empty or only whitespace.
pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, Error> {
    let value = value.trim();

    if value.is_empty() {
        Err(Error::Validation(format!("{field} cannot be empty")))
    } else {
        Ok(value)
    }
}

/// Parse an ISO 8601 calendar date, e.g. `2025-10-01`.
///
/// # Errors
/// Returns [Error::Validation] if `value` is not a valid `YYYY-MM-DD` date.
pub fn parse_date(field: &str, value: &str) -> Result<Date, Error> {
    let value = required(field, value)?;

    Date::parse(value, DATE_FORMAT).map_err(|error| {
        Error::Validation(format!(
            "{field} must be a valid date in the format YYYY-MM-DD, got \"{value}\": {error}"
        ))
    })
}

/// Parse an optional date, treating a missing or blank value as no date.
///
/// # Errors
/// Returns [Error::Validation] if a non-blank `value` is not a valid date.
pub fn optional_date(field: &str, value: Option<&str>) -> Result<Option<Date>, Error> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(field, value).map(Some),
    }
}

/// Parse an email address.
///
/// # Errors
/// Returns [Error::Validation] if `value` is not a well-formed email address.
pub fn parse_email(value: &str) -> Result<EmailAddress, Error> {
    let value = required("email", value)?;

    value
        .parse()
        .map_err(|error| Error::Validation(format!("invalid email address \"{value}\": {error}")))
}

#[cfg(test)]
mod validation_tests {
    use time::macros::date;

    use crate::Error;

    use super::{optional_date, parse_date, parse_email, required};

    #[test]
    fn required_trims_value() {
        assert_eq!(required("name", "  Rainy day  "), Ok("Rainy day"));
    }

    #[test]
    fn required_rejects_blank_value() {
        assert_eq!(
            required("category", "   "),
            Err(Error::Validation("category cannot be empty".to_owned()))
        );
    }

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date("date", "2025-02-28"), Ok(date!(2025 - 02 - 28)));
    }

    #[test]
    fn rejects_invalid_dates() {
        for value in ["2025-02-30", "28/02/2025", "2025-2-28", "yesterday", ""] {
            let result = parse_date("date", value);

            assert!(
                matches!(result, Err(Error::Validation(_))),
                "want validation error for {value:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn optional_date_treats_blank_as_none() {
        assert_eq!(optional_date("deadline", None), Ok(None));
        assert_eq!(optional_date("deadline", Some(" ")), Ok(None));
        assert_eq!(
            optional_date("deadline", Some("2026-01-01")),
            Ok(Some(date!(2026 - 01 - 01)))
        );
    }

    #[test]
    fn parses_email() {
        let email = parse_email(" saver@example.com ").unwrap();

        assert_eq!(email.as_str(), "saver@example.com");
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(matches!(
            parse_email("not an email"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(parse_email(""), Err(Error::Validation(_))));
    }
}
