//! File-backed store of invoice rows, receipts and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use crate::error::ReconError;
use crate::models::invoice::InvoiceRow;
use crate::models::receipt::{Link, ReceiptRecord};

/// Rows keyed by row identifier, receipts by receipt id, links by row identifier.
///
/// Upserts are keyed, so importing or refreshing the same data twice leaves the
/// ledger unchanged. Confirmed links are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledger {
    rows: BTreeMap<String, InvoiceRow>,
    receipts: BTreeMap<u64, ReceiptRecord>,
    links: BTreeMap<String, Link>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger from a JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load a ledger, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No ledger at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Save the ledger as JSON.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Insert or replace rows by row identifier. Returns the number of rows written.
    pub fn upsert_rows(&mut self, rows: impl IntoIterator<Item = InvoiceRow>) -> usize {
        let mut count = 0;
        for row in rows {
            self.rows.insert(row.row_identifier.clone(), row);
            count += 1;
        }
        count
    }

    /// Insert or replace receipts by id. Returns the number of receipts written.
    pub fn upsert_receipts(&mut self, receipts: impl IntoIterator<Item = ReceiptRecord>) -> usize {
        let mut count = 0;
        for receipt in receipts {
            self.receipts.insert(receipt.id, receipt);
            count += 1;
        }
        count
    }

    pub fn rows(&self) -> impl Iterator<Item = &InvoiceRow> {
        self.rows.values()
    }

    pub fn receipts(&self) -> impl Iterator<Item = &ReceiptRecord> {
        self.receipts.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn row(&self, row_identifier: &str) -> Option<&InvoiceRow> {
        self.rows.get(row_identifier)
    }

    pub fn receipt(&self, id: u64) -> Option<&ReceiptRecord> {
        self.receipts.get(&id)
    }

    /// A user's rows billed in the given month, by delivery date then price.
    pub fn rows_for_month(&self, user: &str, year: i32, month: u32) -> Vec<&InvoiceRow> {
        let mut rows: Vec<&InvoiceRow> = self
            .rows
            .values()
            .filter(|r| r.card_holder_email_guess == user && r.is_billed_in(year, month))
            .collect();
        rows.sort_by(|a, b| {
            (a.delivery_date, a.row_price, &a.row_identifier).cmp(&(b.delivery_date, b.row_price, &b.row_identifier))
        });
        rows
    }

    /// A user's receipts dated in the given month, deleted ones excluded.
    pub fn receipts_for_month(&self, user: &str, year: i32, month: u32) -> Vec<&ReceiptRecord> {
        let mut receipts: Vec<&ReceiptRecord> = self
            .receipts
            .values()
            .filter(|r| r.owner == user && !r.is_deleted() && r.is_in_month(year, month))
            .collect();
        receipts.sort_by_key(|r| (r.date, r.price, r.id));
        receipts
    }

    /// Every user seen as a card holder guess or receipt owner, sorted.
    pub fn known_users(&self) -> Vec<String> {
        let users: BTreeSet<&str> = self
            .rows
            .values()
            .map(|r| r.card_holder_email_guess.as_str())
            .chain(self.receipts.values().map(|r| r.owner.as_str()))
            .filter(|user| !user.is_empty())
            .collect();
        users.into_iter().map(str::to_string).collect()
    }

    /// Distinct card holder guesses among rows billed in the given month, sorted.
    pub fn card_holders_billed_in(&self, year: i32, month: u32) -> Vec<String> {
        let users: BTreeSet<&str> = self
            .rows
            .values()
            .filter(|r| r.is_billed_in(year, month))
            .map(|r| r.card_holder_email_guess.as_str())
            .collect();
        users.into_iter().map(str::to_string).collect()
    }

    pub fn link_for(&self, row_identifier: &str) -> Option<&Link> {
        self.links.get(row_identifier)
    }

    /// Write links, leaving confirmed links untouched.
    ///
    /// A link identical in row and receipt to the stored unconfirmed one keeps
    /// its original timestamp. Returns the number of links changed.
    pub fn apply_links(&mut self, links: impl IntoIterator<Item = Link>) -> usize {
        let mut changed = 0;
        for link in links {
            match self.links.get(&link.row_identifier) {
                Some(existing) if existing.is_confirmed() => {
                    debug!("Keeping confirmed link for row {}", link.row_identifier);
                }
                Some(existing) if existing.receipt_id == link.receipt_id => {}
                _ => {
                    self.links.insert(link.row_identifier.clone(), link);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Mark the row's current link as human-verified.
    ///
    /// An already confirmed link keeps its original confirmation; the flag
    /// tells whether this call changed the link.
    pub fn confirm_link(
        &mut self,
        row_identifier: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> crate::Result<(bool, &Link)> {
        let link = self
            .links
            .get_mut(row_identifier)
            .ok_or_else(|| ReconError::NotFound(format!("link for row {}", row_identifier)))?;

        if link.is_confirmed() {
            return Ok((false, &*link));
        }
        link.confirmed_by = Some(by.to_string());
        link.confirmed_at = Some(at);
        Ok((true, &*link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::ReceiptState;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn row(id: &str, user: &str, day: u32, price: i64) -> InvoiceRow {
        InvoiceRow {
            row_identifier: id.to_string(),
            description: String::new(),
            card_holder: String::new(),
            card_holder_id: None,
            card_holder_email_guess: user.to_string(),
            record_date: None,
            delivery_date: NaiveDate::from_ymd_opt(2016, 1, day).unwrap(),
            row_price: Some(Decimal::new(price, 2)),
            foreign_currency: None,
            foreign_currency_name: None,
            foreign_currency_rate: None,
            cc_code: String::new(),
            cc_description: String::new(),
            invoice_date: NaiveDate::from_ymd_opt(2016, 1, 1),
        }
    }

    fn receipt(id: u64, owner: &str, day: u32, state: ReceiptState) -> ReceiptRecord {
        ReceiptRecord {
            id,
            owner: owner.to_string(),
            date: NaiveDate::from_ymd_opt(2016, 1, day).unwrap(),
            price: Some(Decimal::new(500, 2)),
            description: None,
            state,
            account_number: None,
            barcode: None,
            filename: None,
            mime_type: None,
            receipt_type: None,
            uploader: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 2, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut ledger = Ledger::new();
        ledger.upsert_rows([row("1", "a@example.com", 5, 100), row("2", "a@example.com", 6, 200)]);
        ledger.upsert_rows([row("1", "a@example.com", 5, 999)]);

        assert_eq!(ledger.rows().count(), 2);
        assert_eq!(ledger.row("1").unwrap().row_price, Some(Decimal::new(999, 2)));
    }

    #[test]
    fn test_month_queries() {
        let mut ledger = Ledger::new();
        ledger.upsert_rows([
            row("2", "a@example.com", 9, 100),
            row("1", "a@example.com", 5, 100),
            row("3", "b@example.com", 5, 100),
        ]);
        ledger.upsert_receipts([
            receipt(10, "a@example.com", 7, ReceiptState::Normal),
            receipt(11, "a@example.com", 3, ReceiptState::Deleted),
            receipt(12, "a@example.com", 2, ReceiptState::Normal),
        ]);

        let rows: Vec<&str> = ledger
            .rows_for_month("a@example.com", 2016, 1)
            .iter()
            .map(|r| r.row_identifier.as_str())
            .collect();
        assert_eq!(rows, vec!["1", "2"]);
        assert!(ledger.rows_for_month("a@example.com", 2016, 2).is_empty());

        let receipts: Vec<u64> = ledger
            .receipts_for_month("a@example.com", 2016, 1)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(receipts, vec![12, 10]);
    }

    #[test]
    fn test_known_users() {
        let mut ledger = Ledger::new();
        ledger.upsert_rows([row("1", "b@example.com", 5, 100), row("2", "", 5, 100)]);
        ledger.upsert_receipts([
            receipt(1, "a@example.com", 5, ReceiptState::Normal),
            receipt(2, "b@example.com", 5, ReceiptState::Normal),
        ]);

        assert_eq!(ledger.known_users(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_apply_links_keeps_confirmed() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.apply_links([Link::automatic("1", 10, at(1))]), 1);
        ledger.confirm_link("1", "pekka", at(2)).unwrap();

        assert_eq!(ledger.apply_links([Link::automatic("1", 20, at(3))]), 0);

        let link = ledger.link_for("1").unwrap();
        assert_eq!(link.receipt_id, 10);
        assert_eq!(link.confirmed_by.as_deref(), Some("pekka"));
    }

    #[test]
    fn test_apply_links_replaces_unconfirmed() {
        let mut ledger = Ledger::new();
        ledger.apply_links([Link::automatic("1", 10, at(1))]);

        assert_eq!(ledger.apply_links([Link::automatic("1", 10, at(2))]), 0);
        assert_eq!(ledger.link_for("1").unwrap().linked_at, at(1));

        assert_eq!(ledger.apply_links([Link::automatic("1", 20, at(3))]), 1);
        assert_eq!(ledger.link_for("1").unwrap().receipt_id, 20);
    }

    #[test]
    fn test_confirm_is_sticky() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.confirm_link("1", "pekka", at(1)),
            Err(ReconError::NotFound(_))
        ));

        ledger.apply_links([Link::automatic("1", 10, at(1))]);
        let (changed, _) = ledger.confirm_link("1", "pekka", at(2)).unwrap();
        assert!(changed);

        let (changed, link) = ledger.confirm_link("1", "liisa", at(3)).unwrap();
        assert!(!changed);
        assert_eq!(link.confirmed_by.as_deref(), Some("pekka"));
        assert_eq!(link.confirmed_at, Some(at(2)));
    }

    #[test]
    fn test_confirm_twice_by_same_person_changes_nothing() {
        let mut ledger = Ledger::new();
        ledger.apply_links([Link::automatic("1", 10, at(1))]);
        ledger.confirm_link("1", "pekka", at(2)).unwrap();
        let before = ledger.clone();

        let (changed, link) = ledger.confirm_link("1", "pekka", at(3)).unwrap();
        assert!(!changed);
        assert_eq!(link.confirmed_at, Some(at(2)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_card_holders_billed_in() {
        let mut ledger = Ledger::new();
        let mut february = row("4", "c@example.com", 5, 100);
        february.invoice_date = NaiveDate::from_ymd_opt(2016, 2, 1);
        ledger.upsert_rows([
            row("1", "b@example.com", 5, 100),
            row("2", "a@example.com", 6, 100),
            row("3", "b@example.com", 7, 100),
            february,
        ]);

        assert_eq!(ledger.card_holders_billed_in(2016, 1), vec!["a@example.com", "b@example.com"]);
        assert_eq!(ledger.card_holders_billed_in(2016, 2), vec!["c@example.com"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let mut ledger = Ledger::new();
        ledger.upsert_rows([row("1", "a@example.com", 5, 100)]);
        ledger.upsert_receipts([receipt(42, "a@example.com", 5, ReceiptState::Deleted)]);
        ledger.apply_links([Link::automatic("1", 42, at(1))]);
        ledger.save(&path).unwrap();

        assert_eq!(Ledger::load(&path).unwrap(), ledger);
        assert_eq!(Ledger::open(&dir.path().join("missing.json")).unwrap(), Ledger::new());
    }
}
