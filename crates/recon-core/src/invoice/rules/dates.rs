//! Date parsing for the card invoice exports.

use chrono::NaiveDate;

use super::patterns::{NO_BREAK_SPACE, SOFT_HYPHEN};
use crate::error::FormatError;

/// Parse a `YYYY-MM-DD` record date, repairing text-conversion artifacts.
pub fn parse_iso_date(field: &'static str, raw: &str) -> Result<NaiveDate, FormatError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != NO_BREAK_SPACE)
        .map(|c| if c == SOFT_HYPHEN { '-' } else { c })
        .collect();

    NaiveDate::parse_from_str(cleaned.trim(), "%Y-%m-%d").map_err(|_| FormatError::new(field, raw))
}

/// Parse a `DD.MM.YYYY` delivery date.
pub fn parse_day_first_date(field: &'static str, raw: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y").map_err(|_| FormatError::new(field, raw))
}
