//! Field normalization rules shared by both invoice parsers.

pub mod amounts;
pub mod dates;
pub mod holder;
pub mod patterns;

pub use amounts::{parse_price, parse_rate, parse_row_identifier};
pub use dates::{parse_day_first_date, parse_iso_date};
pub use holder::{strip_cost_center, EmailGuesser};
pub use patterns::*;

use crate::error::FormatError;
use crate::models::config::ImportConfig;
use crate::models::invoice::Attribute;

/// How a recognized label's value is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    RowIdentifier,
    Description,
    CardHolderId,
    RecordDate,
    DeliveryDate,
    CcCode,
    CcDescription,
    ForeignAmount,
    ExchangeRate,
    CardHolder,
}

/// Label table. A raw label matches an entry it equals or starts with.
pub const FIELD_LABELS: &[(&str, FieldKind)] = &[
    (LABEL_ROW_IDENTIFIER, FieldKind::RowIdentifier),
    (LABEL_DELIVERY_DATE, FieldKind::DeliveryDate),
    (LABEL_DESCRIPTION, FieldKind::Description),
    (LABEL_CARD_HOLDER_ID, FieldKind::CardHolderId),
    (LABEL_RECORD_DATE, FieldKind::RecordDate),
    (LABEL_CC_CODE, FieldKind::CcCode),
    (LABEL_CC_DESCRIPTION, FieldKind::CcDescription),
    (LABEL_FOREIGN_AMOUNT, FieldKind::ForeignAmount),
    (LABEL_EXCHANGE_RATE, FieldKind::ExchangeRate),
    (LABEL_CARD_HOLDER, FieldKind::CardHolder),
];

/// Look up a raw field label.
pub fn field_kind(label: &str) -> Option<FieldKind> {
    let label = clean_text(label);
    FIELD_LABELS
        .iter()
        .find(|(known, _)| label.starts_with(known))
        .map(|(_, kind)| *kind)
}

/// Replace text-conversion artifacts and trim.
pub fn clean_text(raw: &str) -> String {
    raw.replace(NO_BREAK_SPACE, " ")
        .replace(SOFT_HYPHEN, "-")
        .trim()
        .to_string()
}

/// Maps raw `(label, value)` pairs to canonical attributes.
#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    email: EmailGuesser,
}

impl FieldNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer with the configured e-mail domain and extra overrides.
    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new().with_email_guesser(
            EmailGuesser::new(config.email_domain.clone())
                .with_overrides(config.email_overrides.iter().cloned()),
        )
    }

    /// Use a specific e-mail guesser for card holder fields.
    pub fn with_email_guesser(mut self, email: EmailGuesser) -> Self {
        self.email = email;
        self
    }

    /// Normalize one field. Unrecognized labels yield no attributes.
    pub fn normalize(&self, label: &str, value: &str) -> Result<Vec<Attribute>, FormatError> {
        let Some(kind) = field_kind(label) else {
            return Ok(Vec::new());
        };
        let text = value.trim();

        let attributes = match kind {
            FieldKind::RowIdentifier => vec![Attribute::RowIdentifier(text.to_string())],
            FieldKind::Description => vec![Attribute::Description(text.to_string())],
            FieldKind::CardHolderId => vec![Attribute::CardHolderId(text.to_string())],
            FieldKind::CcCode => vec![Attribute::CcCode(text.to_string())],
            FieldKind::CcDescription => vec![Attribute::CcDescription(text.to_string())],
            FieldKind::RecordDate => vec![Attribute::RecordDate(parse_iso_date("record_date", value)?)],
            FieldKind::DeliveryDate => {
                vec![Attribute::DeliveryDate(parse_day_first_date("delivery_date", value)?)]
            }
            FieldKind::ExchangeRate => {
                vec![Attribute::ForeignCurrencyRate(parse_rate("foreign_currency_rate", value)?)]
            }
            FieldKind::ForeignAmount => self.foreign_amount(value)?,
            FieldKind::CardHolder => self.card_holder(value),
        };

        Ok(attributes)
    }

    /// Split `"<amount> <currency-code>"`.
    fn foreign_amount(&self, value: &str) -> Result<Vec<Attribute>, FormatError> {
        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(amount), Some(code)) => Ok(vec![
                Attribute::ForeignCurrency(parse_price("foreign_currency", amount)?),
                Attribute::ForeignCurrencyName(code.to_string()),
            ]),
            _ => Err(FormatError::new("foreign_currency", value)),
        }
    }

    fn card_holder(&self, value: &str) -> Vec<Attribute> {
        let name = strip_cost_center(value);
        vec![
            Attribute::CardHolder(name.to_string()),
            Attribute::CardHolderEmailGuess(self.email.guess(name)),
        ]
    }
}
