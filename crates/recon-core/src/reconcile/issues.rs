//! Per-user discrepancies for a billing month.

use serde::Serialize;
use std::fmt;

use crate::ledger::Ledger;

/// Something a card holder has to fix for the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    /// Fewer receipts than invoice rows.
    MissingReceipts { receipts: usize, invoice_rows: usize },
    /// More receipts than invoice rows.
    ExtraReceipts { receipts: usize, invoice_rows: usize },
    /// A receipt without a description.
    EmptyDescription { receipt_id: u64 },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingReceipts { receipts, invoice_rows } => write!(
                f,
                "{} receipts but the invoice has {} rows, receipts are missing",
                receipts, invoice_rows
            ),
            Issue::ExtraReceipts { receipts, invoice_rows } => write!(
                f,
                "{} receipts but the invoice has only {} rows, check the receipt data",
                receipts, invoice_rows
            ),
            Issue::EmptyDescription { receipt_id } => {
                write!(f, "receipt {} has an empty description", receipt_id)
            }
        }
    }
}

/// Issues found for one card holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIssues {
    pub user: String,
    pub issues: Vec<Issue>,
}

/// Issues of every card holder billed in the given month.
///
/// Users are the card holder guesses of the month's invoice rows. Receipt
/// counts exclude deleted receipts. Users with nothing to fix are left out.
pub fn month_issues(ledger: &Ledger, year: i32, month: u32) -> Vec<UserIssues> {
    ledger
        .card_holders_billed_in(year, month)
        .into_iter()
        .filter_map(|user| {
            let invoice_rows = ledger.rows_for_month(&user, year, month).len();
            let receipts = ledger.receipts_for_month(&user, year, month);

            let mut issues = Vec::new();
            if invoice_rows > receipts.len() {
                issues.push(Issue::MissingReceipts {
                    receipts: receipts.len(),
                    invoice_rows,
                });
            } else if invoice_rows < receipts.len() {
                issues.push(Issue::ExtraReceipts {
                    receipts: receipts.len(),
                    invoice_rows,
                });
            }

            // Blank descriptions count as empty
            issues.extend(
                receipts
                    .iter()
                    .filter(|r| r.description.as_deref().is_none_or(|d| d.trim().is_empty()))
                    .map(|r| Issue::EmptyDescription { receipt_id: r.id }),
            );

            (!issues.is_empty()).then_some(UserIssues { user, issues })
        })
        .collect()
}
