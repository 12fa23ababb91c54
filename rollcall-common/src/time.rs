//! Date helpers
//!
//! Attendance is keyed by calendar date in `YYYY-MM-DD` form on the wire.

use chrono::{Local, NaiveDate};

use crate::{Error, Result};

/// Wire format for attendance dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` date string
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", input)))
}

/// Format a date for use in a URL path or request body
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(format_date(date), "2024-01-15");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_date(" 2024-02-29 \n").is_ok());
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(matches!(parse_date("15/01/2024"), Err(Error::InvalidInput(_))));
        assert!(parse_date("2023-02-29").is_err());
    }
}
