//! Card invoice row model.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StructuralParseError;

/// One charge extracted from a card invoice export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRow {
    /// Natural key of the source row, stable across re-imports.
    pub row_identifier: String,

    /// Merchant / purchase description.
    #[serde(default)]
    pub description: String,

    /// Card holder name with any cost-center prefix removed.
    #[serde(default)]
    pub card_holder: String,

    /// Card holder's personnel number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_holder_id: Option<String>,

    /// Best-effort e-mail address derived from the card holder name.
    #[serde(default)]
    pub card_holder_email_guess: String,

    /// Date the charge was booked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_date: Option<NaiveDate>,

    /// Date of purchase.
    pub delivery_date: NaiveDate,

    /// Charged amount in local currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_price: Option<Decimal>,

    /// Amount in the original currency for foreign purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_currency: Option<Decimal>,

    /// Three-letter code of the original currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_currency_name: Option<String>,

    /// Exchange rate applied by the card issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_currency_rate: Option<f64>,

    /// Merchant category code.
    #[serde(default)]
    pub cc_code: String,

    /// Merchant category description.
    #[serde(default)]
    pub cc_description: String,

    /// First day of the billing month; assigned by the importer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
}

impl InvoiceRow {
    /// Whether this row belongs to the given billing month.
    pub fn is_billed_in(&self, year: i32, month: u32) -> bool {
        self.invoice_date
            .is_some_and(|d| d.year() == year && d.month() == month)
    }
}

/// A canonical attribute with its typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    RowIdentifier(String),
    Description(String),
    CardHolder(String),
    CardHolderId(String),
    CardHolderEmailGuess(String),
    RecordDate(NaiveDate),
    DeliveryDate(NaiveDate),
    RowPrice(Decimal),
    ForeignCurrency(Decimal),
    ForeignCurrencyName(String),
    ForeignCurrencyRate(f64),
    CcCode(String),
    CcDescription(String),
}

impl Attribute {
    /// Canonical attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::RowIdentifier(_) => "row_identifier",
            Attribute::Description(_) => "description",
            Attribute::CardHolder(_) => "card_holder",
            Attribute::CardHolderId(_) => "card_holder_id",
            Attribute::CardHolderEmailGuess(_) => "card_holder_email_guess",
            Attribute::RecordDate(_) => "record_date",
            Attribute::DeliveryDate(_) => "delivery_date",
            Attribute::RowPrice(_) => "row_price",
            Attribute::ForeignCurrency(_) => "foreign_currency",
            Attribute::ForeignCurrencyName(_) => "foreign_currency_name",
            Attribute::ForeignCurrencyRate(_) => "foreign_currency_rate",
            Attribute::CcCode(_) => "cc_code",
            Attribute::CcDescription(_) => "cc_description",
        }
    }
}

/// An invoice record under construction.
///
/// Later attributes overwrite earlier ones with the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDraft {
    pub row_identifier: Option<String>,
    pub description: Option<String>,
    pub card_holder: Option<String>,
    pub card_holder_id: Option<String>,
    pub card_holder_email_guess: Option<String>,
    pub record_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub row_price: Option<Decimal>,
    pub foreign_currency: Option<Decimal>,
    pub foreign_currency_name: Option<String>,
    pub foreign_currency_rate: Option<f64>,
    pub cc_code: Option<String>,
    pub cc_description: Option<String>,
}

impl RowDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first attribute is applied.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::RowIdentifier(v) => self.row_identifier = Some(v),
            Attribute::Description(v) => self.description = Some(v),
            Attribute::CardHolder(v) => self.card_holder = Some(v),
            Attribute::CardHolderId(v) => self.card_holder_id = Some(v),
            Attribute::CardHolderEmailGuess(v) => self.card_holder_email_guess = Some(v),
            Attribute::RecordDate(v) => self.record_date = Some(v),
            Attribute::DeliveryDate(v) => self.delivery_date = Some(v),
            Attribute::RowPrice(v) => self.row_price = Some(v),
            Attribute::ForeignCurrency(v) => self.foreign_currency = Some(v),
            Attribute::ForeignCurrencyName(v) => self.foreign_currency_name = Some(v),
            Attribute::ForeignCurrencyRate(v) => self.foreign_currency_rate = Some(v),
            Attribute::CcCode(v) => self.cc_code = Some(v),
            Attribute::CcDescription(v) => self.cc_description = Some(v),
        }
    }

    pub fn extend(&mut self, attributes: impl IntoIterator<Item = Attribute>) {
        for attribute in attributes {
            self.apply(attribute);
        }
    }

    /// Finish the draft; `index` is the record's position in the document.
    pub fn finish(self, index: usize) -> Result<InvoiceRow, StructuralParseError> {
        let row_identifier = self.row_identifier.ok_or(StructuralParseError::MissingField {
            field: "row_identifier",
            index,
        })?;
        let delivery_date = self.delivery_date.ok_or(StructuralParseError::MissingField {
            field: "delivery_date",
            index,
        })?;

        Ok(InvoiceRow {
            row_identifier,
            description: self.description.unwrap_or_default(),
            card_holder: self.card_holder.unwrap_or_default(),
            card_holder_id: self.card_holder_id,
            card_holder_email_guess: self.card_holder_email_guess.unwrap_or_default(),
            record_date: self.record_date,
            delivery_date,
            row_price: self.row_price,
            foreign_currency: self.foreign_currency,
            foreign_currency_name: self.foreign_currency_name,
            foreign_currency_rate: self.foreign_currency_rate,
            cc_code: self.cc_code.unwrap_or_default(),
            cc_description: self.cc_description.unwrap_or_default(),
            invoice_date: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_requires_identifier() {
        let mut draft = RowDraft::new();
        draft.apply(Attribute::DeliveryDate(NaiveDate::from_ymd_opt(2016, 1, 5).unwrap()));

        assert_eq!(
            draft.finish(3),
            Err(StructuralParseError::MissingField {
                field: "row_identifier",
                index: 3
            })
        );
    }

    #[test]
    fn test_draft_later_attribute_wins() {
        let mut draft = RowDraft::new();
        assert!(draft.is_empty());

        draft.extend([
            Attribute::RowIdentifier("1".to_string()),
            Attribute::DeliveryDate(NaiveDate::from_ymd_opt(2016, 1, 5).unwrap()),
            Attribute::Description("first".to_string()),
            Attribute::Description("second".to_string()),
        ]);
        assert!(!draft.is_empty());

        let row = draft.finish(0).unwrap();
        assert_eq!(row.description, "second");
        assert_eq!(row.row_price, None);
        assert_eq!(row.card_holder, "");
    }

    #[test]
    fn test_billing_month() {
        let mut draft = RowDraft::new();
        draft.extend([
            Attribute::RowIdentifier("1".to_string()),
            Attribute::DeliveryDate(NaiveDate::from_ymd_opt(2016, 1, 5).unwrap()),
        ]);
        let mut row = draft.finish(0).unwrap();
        assert!(!row.is_billed_in(2016, 2));

        row.invoice_date = NaiveDate::from_ymd_opt(2016, 2, 1);
        assert!(row.is_billed_in(2016, 2));
        assert!(!row.is_billed_in(2017, 2));
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(Attribute::RowPrice(Decimal::ONE).name(), "row_price");
        assert_eq!(
            Attribute::ForeignCurrencyName("USD".to_string()).name(),
            "foreign_currency_name"
        );
    }
}
