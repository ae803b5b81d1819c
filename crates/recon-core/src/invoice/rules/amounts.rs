//! Amount parsing for the card invoice exports.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::SOFT_HYPHEN;
use crate::error::FormatError;

/// Parse an invoice amount such as `12,50` or `­1,50` (soft hyphen as minus).
pub fn parse_price(field: &'static str, raw: &str) -> Result<Decimal, FormatError> {
    let normalized = raw.replace(',', ".").replace(SOFT_HYPHEN, "-");
    Decimal::from_str(normalized.trim()).map_err(|_| FormatError::new(field, raw))
}

/// Parse an exchange rate, accepting either decimal separator.
pub fn parse_rate(field: &'static str, raw: &str) -> Result<f64, FormatError> {
    let normalized = raw.replace(',', ".");
    normalized
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite())
        .ok_or_else(|| FormatError::new(field, raw))
}

/// Parse a numeric item identifier, keeping its digits verbatim.
pub fn parse_row_identifier(raw: &str) -> Result<String, FormatError> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(trimmed.to_string())
    } else {
        Err(FormatError::new("row_identifier", raw))
    }
}
