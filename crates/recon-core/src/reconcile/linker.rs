//! Automatic linking of invoice rows to receipts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::ledger::Ledger;
use crate::models::config::ReconcileConfig;
use crate::models::invoice::InvoiceRow;
use crate::models::receipt::{Link, ReceiptRecord};

/// Days either side of the delivery date searched for receipts.
pub const DEFAULT_DATE_TOLERANCE_DAYS: i64 = 3;

/// Why a link was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkReason {
    /// The only receipt in the date window.
    SingleCandidate,
    /// First candidate whose price equals the row price or foreign amount.
    PriceMatch,
}

/// Outcome of matching one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum LinkDecision {
    /// The row has a confirmed link; nothing changes.
    KeepConfirmed,
    Link { receipt_id: u64, reason: LinkReason },
    /// No candidate, or several and none with a matching price.
    Unresolved { candidates: Vec<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    pub row_identifier: String,
    #[serde(flatten)]
    pub decision: LinkDecision,
}

/// Decisions for a set of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPlan {
    pub outcomes: Vec<RowOutcome>,
}

impl LinkPlan {
    /// Unconfirmed links to write, stamped with `at`.
    pub fn proposals(&self, at: DateTime<Utc>) -> Vec<Link> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome.decision {
                LinkDecision::Link { receipt_id, .. } => {
                    Some(Link::automatic(outcome.row_identifier.clone(), receipt_id, at))
                }
                _ => None,
            })
            .collect()
    }

    pub fn linked_count(&self) -> usize {
        self.count(|d| matches!(d, LinkDecision::Link { .. }))
    }

    pub fn confirmed_count(&self) -> usize {
        self.count(|d| matches!(d, LinkDecision::KeepConfirmed))
    }

    pub fn unresolved_count(&self) -> usize {
        self.count(|d| matches!(d, LinkDecision::Unresolved { .. }))
    }

    fn count(&self, predicate: impl Fn(&LinkDecision) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.decision)).count()
    }
}

/// Matches rows to receipts by owner, date proximity and price.
#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance_days: i64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            tolerance_days: DEFAULT_DATE_TOLERANCE_DAYS,
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance_days(mut self, days: i64) -> Self {
        self.tolerance_days = days;
        self
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self::new().with_tolerance_days(config.date_tolerance_days)
    }

    /// Decide every row in the ledger against all of its receipts.
    pub fn plan(&self, ledger: &Ledger) -> LinkPlan {
        let receipts: Vec<&ReceiptRecord> = ledger.receipts().collect();

        let outcomes: Vec<RowOutcome> = ledger
            .rows()
            .map(|row| RowOutcome {
                row_identifier: row.row_identifier.clone(),
                decision: self.decide(row, &receipts, ledger.link_for(&row.row_identifier)),
            })
            .collect();

        let plan = LinkPlan { outcomes };
        info!(
            "Link plan: {} linked, {} confirmed, {} unresolved",
            plan.linked_count(),
            plan.confirmed_count(),
            plan.unresolved_count()
        );
        plan
    }

    /// Decide one row given its current link.
    pub fn decide(&self, row: &InvoiceRow, receipts: &[&ReceiptRecord], existing: Option<&Link>) -> LinkDecision {
        if existing.is_some_and(Link::is_confirmed) {
            debug!("Row {} has a confirmed link, skipping", row.row_identifier);
            return LinkDecision::KeepConfirmed;
        }

        match self.candidates(row, receipts).as_slice() {
            [] => LinkDecision::Unresolved { candidates: Vec::new() },
            [only] => LinkDecision::Link {
                receipt_id: only.id,
                reason: LinkReason::SingleCandidate,
            },
            // Several candidates: first price match in candidate order
            many => match many.iter().find(|receipt| price_matches(row, receipt)) {
                Some(receipt) => LinkDecision::Link {
                    receipt_id: receipt.id,
                    reason: LinkReason::PriceMatch,
                },
                None => {
                    debug!("Row {} has {} candidates and no price match", row.row_identifier, many.len());
                    LinkDecision::Unresolved {
                        candidates: many.iter().map(|r| r.id).collect(),
                    }
                }
            },
        }
    }

    /// Receipts the row's card holder owns, not deleted, dated within the
    /// tolerance of the delivery date. Ordered by date, price, id.
    pub fn candidates<'r>(&self, row: &InvoiceRow, receipts: &[&'r ReceiptRecord]) -> Vec<&'r ReceiptRecord> {
        let mut candidates: Vec<&ReceiptRecord> = receipts
            .iter()
            .copied()
            .filter(|r| {
                r.owner == row.card_holder_email_guess
                    && !r.is_deleted()
                    && (r.date - row.delivery_date).num_days().abs() <= self.tolerance_days
            })
            .collect();
        candidates.sort_by_key(|r| (r.date, r.price, r.id));
        candidates
    }
}

fn price_matches(row: &InvoiceRow, receipt: &ReceiptRecord) -> bool {
    let Some(price) = receipt.price else {
        return false;
    };
    row.row_price == Some(price) || row.foreign_currency == Some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::ReceiptState;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const USER: &str = "matti.meikalainen@solinor.com";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 1, d).unwrap()
    }

    fn row(id: &str, delivery: u32, cents: i64) -> InvoiceRow {
        InvoiceRow {
            row_identifier: id.to_string(),
            description: "RAVINTOLA".to_string(),
            card_holder: "MATTI MEIKÄLÄINEN".to_string(),
            card_holder_id: None,
            card_holder_email_guess: USER.to_string(),
            record_date: None,
            delivery_date: day(delivery),
            row_price: Some(Decimal::new(cents, 2)),
            foreign_currency: None,
            foreign_currency_name: None,
            foreign_currency_rate: None,
            cc_code: String::new(),
            cc_description: String::new(),
            invoice_date: Some(day(1)),
        }
    }

    fn receipt(id: u64, date: u32, cents: i64) -> ReceiptRecord {
        ReceiptRecord {
            id,
            owner: USER.to_string(),
            date: day(date),
            price: Some(Decimal::new(cents, 2)),
            description: None,
            state: ReceiptState::Normal,
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

    fn ledger(rows: Vec<InvoiceRow>, receipts: Vec<ReceiptRecord>) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.upsert_rows(rows);
        ledger.upsert_receipts(receipts);
        ledger
    }

    fn decision(ledger: &Ledger) -> LinkDecision {
        Reconciler::new().plan(ledger).outcomes.remove(0).decision
    }

    #[test]
    fn test_price_disambiguates_same_day() {
        let ledger = ledger(vec![row("1", 10, 4200)], vec![receipt(1, 10, 1700), receipt(2, 10, 4200)]);

        assert_eq!(
            decision(&ledger),
            LinkDecision::Link {
                receipt_id: 2,
                reason: LinkReason::PriceMatch
            }
        );
    }

    #[test]
    fn test_no_price_match_is_unresolved() {
        let ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(1, 10, 1000), receipt(2, 10, 1100)]);

        assert_eq!(decision(&ledger), LinkDecision::Unresolved { candidates: vec![1, 2] });
        assert!(Reconciler::new().plan(&ledger).proposals(at(1)).is_empty());
    }

    #[test]
    fn test_single_candidate_within_tolerance() {
        let ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(7, 13, 999), receipt(8, 14, 1200)]);

        assert_eq!(
            decision(&ledger),
            LinkDecision::Link {
                receipt_id: 7,
                reason: LinkReason::SingleCandidate
            }
        );
    }

    #[test]
    fn test_no_candidates() {
        let ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(1, 20, 1200)]);
        assert_eq!(decision(&ledger), LinkDecision::Unresolved { candidates: vec![] });
    }

    #[test]
    fn test_foreign_amount_matches() {
        let mut foreign = row("1", 10, 1197);
        foreign.foreign_currency = Some(Decimal::new(1299, 2));
        let ledger = ledger(vec![foreign], vec![receipt(1, 9, 500), receipt(2, 11, 1299)]);

        assert_eq!(
            decision(&ledger),
            LinkDecision::Link {
                receipt_id: 2,
                reason: LinkReason::PriceMatch
            }
        );
    }

    #[test]
    fn test_first_match_in_candidate_order() {
        let ledger = ledger(
            vec![row("1", 10, 500)],
            vec![receipt(9, 11, 500), receipt(3, 10, 500), receipt(4, 8, 100)],
        );

        assert_eq!(
            decision(&ledger),
            LinkDecision::Link {
                receipt_id: 3,
                reason: LinkReason::PriceMatch
            }
        );
    }

    #[test]
    fn test_other_users_and_deleted_receipts_are_ignored() {
        let mut other = receipt(1, 10, 1200);
        other.owner = "someone.else@solinor.com".to_string();
        let mut deleted = receipt(2, 10, 1200);
        deleted.state = ReceiptState::Deleted;

        let ledger = ledger(vec![row("1", 10, 1200)], vec![other, deleted, receipt(3, 11, 50)]);
        assert_eq!(
            decision(&ledger),
            LinkDecision::Link {
                receipt_id: 3,
                reason: LinkReason::SingleCandidate
            }
        );
    }

    #[test]
    fn test_confirmed_link_is_never_replaced() {
        let mut ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(1, 25, 1200)]);
        ledger.apply_links([Link::automatic("1", 1, at(1))]);
        ledger.confirm_link("1", "liisa", at(2)).unwrap();

        ledger.upsert_receipts([receipt(2, 10, 1200)]);
        let plan = Reconciler::new().plan(&ledger);

        assert_eq!(plan.outcomes[0].decision, LinkDecision::KeepConfirmed);
        assert!(plan.proposals(at(3)).is_empty());
        assert_eq!(ledger.apply_links(plan.proposals(at(3))), 0);
        assert_eq!(ledger.link_for("1").unwrap().receipt_id, 1);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(1, 10, 1200)]);
        let reconciler = Reconciler::new();

        let first = reconciler.plan(&ledger);
        assert_eq!(ledger.apply_links(first.proposals(at(1))), 1);

        let second = reconciler.plan(&ledger);
        assert_eq!(second, first);
        assert_eq!(second.proposals(at(2)).len(), 1);
        assert_eq!(ledger.apply_links(second.proposals(at(2))), 0);
        assert_eq!(ledger.link_for("1").unwrap().linked_at, at(1));
    }

    #[test]
    fn test_unconfirmed_link_is_replaced() {
        let mut ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(1, 10, 1200)]);
        ledger.apply_links([Link::automatic("1", 99, at(1))]);

        let plan = Reconciler::new().plan(&ledger);
        ledger.apply_links(plan.proposals(at(2)));
        assert_eq!(ledger.link_for("1").unwrap().receipt_id, 1);
    }

    #[test]
    fn test_plan_serializes_decisions() {
        let ledger = ledger(vec![row("1", 10, 1200)], vec![receipt(5, 10, 1200)]);
        let json = serde_json::to_value(Reconciler::new().plan(&ledger)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "outcomes": [{
                    "row_identifier": "1",
                    "decision": "link",
                    "receipt_id": 5,
                    "reason": "single_candidate"
                }]
            })
        );
    }
}
