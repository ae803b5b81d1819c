//! Receipt and link models.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A digital receipt fetched from the receipt provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Provider-side identifier.
    pub id: u64,

    /// User (e-mail) the receipt belongs to.
    pub owner: String,

    /// Purchase date.
    pub date: NaiveDate,

    /// Total of the non-negative price lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub state: ReceiptState,

    /// Bookkeeping account; a configured sentinel marks cash purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl ReceiptRecord {
    pub fn is_deleted(&self) -> bool {
        self.state == ReceiptState::Deleted
    }

    pub fn is_in_month(&self, year: i32, month: u32) -> bool {
        self.date.year() == year && self.date.month() == month
    }

    pub fn is_cash_purchase(&self, cash_account_number: Option<i64>) -> bool {
        cash_account_number.is_some() && self.account_number == cash_account_number
    }
}

/// Provider-side lifecycle state of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReceiptState {
    #[default]
    Normal,
    Deleted,
    Other(String),
}

impl From<String> for ReceiptState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "normal" => ReceiptState::Normal,
            "deleted" => ReceiptState::Deleted,
            _ => ReceiptState::Other(s),
        }
    }
}

impl From<ReceiptState> for String {
    fn from(state: ReceiptState) -> Self {
        match state {
            ReceiptState::Normal => "normal".to_string(),
            ReceiptState::Deleted => "deleted".to_string(),
            ReceiptState::Other(s) => s,
        }
    }
}

/// Association between an invoice row and a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub row_identifier: String,
    pub receipt_id: u64,

    pub linked_at: DateTime<Utc>,

    /// Set once a human has verified the link. Confirmed links are immutable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Link {
    /// An unconfirmed link created by automatic matching.
    pub fn automatic(row_identifier: impl Into<String>, receipt_id: u64, at: DateTime<Utc>) -> Self {
        Self {
            row_identifier: row_identifier.into(),
            receipt_id,
            linked_at: at,
            confirmed_by: None,
            confirmed_at: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_state_roundtrip_strings() {
        assert_eq!(ReceiptState::from("deleted".to_string()), ReceiptState::Deleted);
        assert_eq!(ReceiptState::from(String::new()), ReceiptState::Normal);
        assert_eq!(
            ReceiptState::from("archived".to_string()),
            ReceiptState::Other("archived".to_string())
        );
        assert_eq!(String::from(ReceiptState::Deleted), "deleted");
    }

    #[test]
    fn test_cash_purchase_requires_sentinel() {
        let receipt = ReceiptRecord {
            id: 1,
            owner: "a@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2016, 1, 5).unwrap(),
            price: None,
            description: None,
            state: ReceiptState::Normal,
            account_number: None,
            barcode: None,
            filename: None,
            mime_type: None,
            receipt_type: None,
            uploader: None,
        };
        assert!(!receipt.is_cash_purchase(None));
        assert!(!receipt.is_cash_purchase(Some(1900)));

        let cash = ReceiptRecord {
            account_number: Some(1900),
            ..receipt
        };
        assert!(cash.is_cash_purchase(Some(1900)));
    }
}
