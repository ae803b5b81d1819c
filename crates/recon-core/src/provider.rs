//! Receipt provider contract and retry policy.
//!
//! The network client lives outside the core; this module defines what it must
//! provide, the wire record it returns, and how wire records become
//! [`ReceiptRecord`]s.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::error::{FormatError, ProviderError, ReconError};
use crate::ledger::Ledger;
use crate::models::config::ReconcileConfig;
use crate::models::receipt::{ReceiptRecord, ReceiptState};

/// Re-authentication attempts before giving up.
pub const DEFAULT_MAX_AUTH_RETRIES: u32 = 2;

/// Source of receipt records.
///
/// Implementations report a rejected access token as
/// [`ProviderError::AuthExpired`]; retrying is left to [`RetryingProvider`].
pub trait ReceiptProvider {
    /// Receipts of `user` dated within `[start, end]`.
    fn fetch_receipts(
        &self,
        user: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RawReceipt>, ProviderError>> + Send;

    /// A single receipt, `None` if the provider does not know it.
    fn fetch_receipt(&self, id: u64) -> impl Future<Output = Result<Option<RawReceipt>, ProviderError>> + Send;

    /// Obtain a fresh access token.
    fn reauthenticate(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

/// Receipt as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReceipt {
    pub id: u64,

    /// `YYYY-MM-DD`.
    pub date: String,

    #[serde(default)]
    pub prices: Vec<RawPrice>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "lenient_int")]
    pub account_number: Option<i64>,

    #[serde(default)]
    pub barcode: Option<String>,

    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default, rename = "type")]
    pub receipt_type: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,
}

/// One price line of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrice {
    /// Integer cents; a leading `-` marks a refund or correction line.
    pub price: String,

    #[serde(default, deserialize_with = "lenient_int")]
    pub vat_percent: Option<i64>,

    #[serde(default, deserialize_with = "lenient_int")]
    pub account_number: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

/// Accept integers sent either as JSON numbers or as strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<IntOrText>::deserialize(deserializer)? {
        Some(IntOrText::Int(n)) => Some(n),
        Some(IntOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Convert an integer-cents string to a currency amount: `"1234"` is 12.34.
pub fn parse_cents(raw: &str) -> Result<Decimal, FormatError> {
    raw.trim()
        .parse::<i64>()
        .map(|cents| Decimal::new(cents, 2))
        .map_err(|_| FormatError::new("price", raw))
}

impl RawReceipt {
    /// Convert into a record owned by `owner`.
    ///
    /// Negative price lines are skipped; the rest are summed. A receipt without
    /// any price lines has no price.
    pub fn into_record(self, owner: &str) -> Result<ReceiptRecord, ProviderError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| ProviderError::Schema(format!("receipt {} has invalid date {:?}", self.id, self.date)))?;

        // Refund and correction lines carry a leading minus
        let mut price = None;
        for line in self.prices.iter().filter(|p| !p.price.trim_start().starts_with('-')) {
            let amount = parse_cents(&line.price)
                .map_err(|e| ProviderError::Schema(format!("receipt {}: {}", self.id, e)))?;
            price = Some(price.unwrap_or(Decimal::ZERO) + amount);
        }
        if price.is_none() && !self.prices.is_empty() {
            price = Some(Decimal::ZERO);
        }

        let account_number = self
            .account_number
            .or_else(|| self.prices.iter().find_map(|p| p.account_number));

        Ok(ReceiptRecord {
            id: self.id,
            owner: owner.to_string(),
            date,
            price,
            description: self.description,
            state: ReceiptState::from(self.state.unwrap_or_default()),
            account_number,
            barcode: self.barcode,
            filename: self.filename,
            mime_type: self.mime_type,
            receipt_type: self.receipt_type,
            uploader: self.uploader,
        })
    }
}

/// Wraps a provider with bounded re-authentication.
#[derive(Debug, Clone)]
pub struct RetryingProvider<P> {
    inner: P,
    max_retries: u32,
}

impl<P: ReceiptProvider> RetryingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_AUTH_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                // Token rejected: log in again and repeat the same call
                Err(ProviderError::AuthExpired) if retries < self.max_retries => {
                    retries += 1;
                    warn!("Access token expired, re-authenticating ({}/{})", retries, self.max_retries);
                    self.inner.reauthenticate().await?;
                }
                Err(ProviderError::AuthExpired) => {
                    return Err(ProviderError::RetriesExhausted(self.max_retries));
                }
                result => return result,
            }
        }
    }

    pub async fn fetch_receipts(
        &self,
        user: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawReceipt>, ProviderError> {
        self.with_retry(|| self.inner.fetch_receipts(user, start, end)).await
    }

    pub async fn fetch_receipt(&self, id: u64) -> Result<Option<RawReceipt>, ProviderError> {
        self.with_retry(|| self.inner.fetch_receipt(id)).await
    }

    /// Fetch and convert a user's receipts.
    pub async fn fetch_records(
        &self,
        user: &str,
        window: RefreshWindow,
    ) -> Result<Vec<ReceiptRecord>, ProviderError> {
        let raw = self.fetch_receipts(user, window.start, window.end).await?;
        debug!("Provider returned {} receipts for {}", raw.len(), user);
        raw.into_iter().map(|r| r.into_record(user)).collect()
    }

    /// Fetch a user's receipts and upsert them into the ledger.
    pub async fn refresh_user(
        &self,
        ledger: &mut Ledger,
        user: &str,
        window: RefreshWindow,
    ) -> crate::Result<usize> {
        let records = self.fetch_records(user, window).await?;
        let count = ledger.upsert_receipts(records);
        info!("Refreshed {} receipts for {}", count, user);
        Ok(count)
    }

    /// Fetch one receipt and upsert it into the ledger.
    ///
    /// The owner is `owner` when given, otherwise the owner already stored in
    /// the ledger, otherwise the uploader reported by the provider. Returns
    /// `None` when the provider does not know the receipt.
    pub async fn refresh_receipt(
        &self,
        ledger: &mut Ledger,
        id: u64,
        owner: Option<&str>,
    ) -> crate::Result<Option<ReceiptRecord>> {
        let Some(raw) = self.fetch_receipt(id).await? else {
            debug!("Provider does not know receipt {}", id);
            return Ok(None);
        };

        let owner = owner
            .map(str::to_string)
            .or_else(|| ledger.receipt(id).map(|r| r.owner.clone()))
            .or_else(|| raw.uploader.clone())
            .ok_or_else(|| ReconError::NotFound(format!("owner of receipt {}", id)))?;

        let record = raw.into_record(&owner)?;
        ledger.upsert_receipts([record.clone()]);
        info!("Refreshed receipt {} for {}", id, owner);
        Ok(Some(record))
    }
}

/// Date range a refresh fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RefreshWindow {
    pub fn around(today: NaiveDate, days_back: i64, days_forward: i64) -> Self {
        Self {
            start: today - Duration::days(days_back),
            end: today + Duration::days(days_forward),
        }
    }

    pub fn from_config(config: &ReconcileConfig, today: NaiveDate) -> Self {
        Self::around(today, config.refresh_days_back, config.refresh_days_forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn raw(id: u64, date: &str, prices: &[&str]) -> RawReceipt {
        RawReceipt {
            id,
            date: date.to_string(),
            prices: prices
                .iter()
                .map(|p| RawPrice {
                    price: p.to_string(),
                    vat_percent: Some(24),
                    account_number: None,
                })
                .collect(),
            description: Some("Lounas".to_string()),
            state: None,
            account_number: None,
            barcode: None,
            filename: None,
            mime_type: None,
            receipt_type: None,
            uploader: None,
        }
    }

    /// Answers `AuthExpired` a fixed number of times before succeeding.
    struct FlakyProvider {
        expired_answers: AtomicU32,
        reauths: AtomicU32,
    }

    impl FlakyProvider {
        fn new(expired_answers: u32) -> Self {
            Self {
                expired_answers: AtomicU32::new(expired_answers),
                reauths: AtomicU32::new(0),
            }
        }

        fn answer<T>(&self, value: T) -> Result<T, ProviderError> {
            let remaining = self.expired_answers.load(Ordering::SeqCst);
            if remaining > 0 {
                self.expired_answers.store(remaining - 1, Ordering::SeqCst);
                Err(ProviderError::AuthExpired)
            } else {
                Ok(value)
            }
        }
    }

    impl ReceiptProvider for FlakyProvider {
        async fn fetch_receipts(
            &self,
            _user: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<RawReceipt>, ProviderError> {
            self.answer(vec![raw(1, &start.format("%Y-%m-%d").to_string(), &["1250"])])
        }

        async fn fetch_receipt(&self, id: u64) -> Result<Option<RawReceipt>, ProviderError> {
            self.answer(Some(raw(id, "2016-01-05", &["500"])))
        }

        async fn reauthenticate(&self) -> Result<(), ProviderError> {
            self.reauths.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn window() -> RefreshWindow {
        RefreshWindow::around(NaiveDate::from_ymd_opt(2016, 1, 10).unwrap(), 5, 5)
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("1234"), Ok(Decimal::new(1234, 2)));
        assert_eq!(parse_cents("5"), Ok(Decimal::new(5, 2)));
        assert_eq!(parse_cents("100"), Ok(Decimal::ONE));
        assert!(parse_cents("12,34").is_err());
    }

    #[test]
    fn test_into_record_skips_negative_lines() {
        let record = raw(7, "2016-01-05", &["1000", "-250", "250"])
            .into_record("a@example.com")
            .unwrap();

        assert_eq!(record.price, Some(Decimal::new(1250, 2)));
        assert_eq!(record.owner, "a@example.com");
        assert_eq!(record.state, ReceiptState::Normal);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2016, 1, 5).unwrap());
    }

    #[test]
    fn test_into_record_without_prices() {
        let record = raw(7, "2016-01-05", &[]).into_record("a@example.com").unwrap();
        assert_eq!(record.price, None);

        let refund_only = raw(8, "2016-01-05", &["-100"]).into_record("a@example.com").unwrap();
        assert_eq!(refund_only.price, Some(Decimal::ZERO));
    }

    #[test]
    fn test_into_record_rejects_bad_date() {
        assert!(matches!(
            raw(7, "05.01.2016", &["100"]).into_record("a@example.com"),
            Err(ProviderError::Schema(_))
        ));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "id": 991,
            "date": "2016-01-05",
            "prices": [{"price": "1234", "vat_percent": "24", "account_number": 1900}],
            "state": "deleted",
            "type": "receipt",
            "barcode": null
        }"#;
        let record = serde_json::from_str::<RawReceipt>(json)
            .unwrap()
            .into_record("a@example.com")
            .unwrap();

        assert_eq!(record.price, Some(Decimal::new(1234, 2)));
        assert_eq!(record.account_number, Some(1900));
        assert_eq!(record.receipt_type.as_deref(), Some("receipt"));
        assert!(record.is_deleted());
    }

    #[tokio::test]
    async fn test_retry_recovers_after_reauth() {
        let provider = RetryingProvider::new(FlakyProvider::new(2));

        let records = provider.fetch_records("a@example.com", window()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2016, 1, 5).unwrap());
        assert_eq!(provider.inner().reauths.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let provider = RetryingProvider::new(FlakyProvider::new(3));

        assert_eq!(
            provider.fetch_receipt(5).await,
            Err(ProviderError::RetriesExhausted(2))
        );
        assert_eq!(provider.inner().reauths.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_upserts_into_ledger() {
        let provider = RetryingProvider::new(FlakyProvider::new(0)).with_max_retries(0);
        let mut ledger = Ledger::new();

        assert_eq!(provider.refresh_user(&mut ledger, "a@example.com", window()).await.unwrap(), 1);
        assert_eq!(provider.refresh_user(&mut ledger, "a@example.com", window()).await.unwrap(), 1);
        assert_eq!(ledger.receipts().count(), 1);
        assert_eq!(ledger.known_users(), vec!["a@example.com"]);
    }

    #[tokio::test]
    async fn test_refresh_receipt_resolves_owner() {
        let provider = RetryingProvider::new(FlakyProvider::new(1));
        let mut ledger = Ledger::new();

        let record = provider
            .refresh_receipt(&mut ledger, 5, Some("a@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.owner, "a@example.com");
        assert_eq!(record.price, Some(Decimal::new(500, 2)));
        assert_eq!(provider.inner().reauths.load(Ordering::SeqCst), 1);

        // Stored owner is reused when none is given
        let again = provider.refresh_receipt(&mut ledger, 5, None).await.unwrap().unwrap();
        assert_eq!(again.owner, "a@example.com");
        assert_eq!(ledger.receipt(5), Some(&again));
    }

    #[tokio::test]
    async fn test_refresh_receipt_without_owner() {
        let provider = RetryingProvider::new(FlakyProvider::new(0));
        let mut ledger = Ledger::new();

        assert!(matches!(
            provider.refresh_receipt(&mut ledger, 5, None).await,
            Err(ReconError::NotFound(_))
        ));
        assert_eq!(ledger.receipts().count(), 0);
    }
}
