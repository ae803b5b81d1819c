//! Side-by-side review table of invoice rows and receipts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::invoice::InvoiceRow;
use crate::models::receipt::ReceiptRecord;

/// Description of the virtual invoice row synthesized for cash purchases.
pub const CASH_PURCHASE_DESCRIPTION: &str = "Cash purchase";

/// Invoice side of a review pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayInvoice {
    /// `None` for a synthesized cash-purchase row.
    pub row_identifier: Option<String>,
    pub description: String,
    pub price: Option<Decimal>,
    pub foreign_currency: Option<Decimal>,
    pub foreign_currency_name: Option<String>,
    pub cash_purchase: bool,
}

impl DisplayInvoice {
    fn from_row(row: &InvoiceRow) -> Self {
        Self {
            row_identifier: Some(row.row_identifier.clone()),
            description: row.description.clone(),
            price: row.row_price,
            foreign_currency: row.foreign_currency,
            foreign_currency_name: row.foreign_currency_name.clone(),
            cash_purchase: false,
        }
    }

    fn cash_purchase(receipt: &ReceiptRecord) -> Self {
        Self {
            row_identifier: None,
            description: CASH_PURCHASE_DESCRIPTION.to_string(),
            price: receipt.price,
            foreign_currency: None,
            foreign_currency_name: None,
            cash_purchase: true,
        }
    }
}

/// Receipt side of a review pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayReceipt {
    pub id: u64,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

impl From<&ReceiptRecord> for DisplayReceipt {
    fn from(receipt: &ReceiptRecord) -> Self {
        Self {
            id: receipt.id,
            description: receipt.description.clone(),
            price: receipt.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPair {
    pub invoice: Option<DisplayInvoice>,
    pub receipt: Option<DisplayReceipt>,
    /// Both sides present with exactly equal prices.
    pub matching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDay {
    pub date: NaiveDate,
    pub pairs: Vec<ReviewPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewTable {
    pub days: Vec<ReviewDay>,
}

impl ReviewTable {
    pub fn pairs(&self) -> impl Iterator<Item = (NaiveDate, &ReviewPair)> {
        self.days
            .iter()
            .flat_map(|day| day.pairs.iter().map(move |pair| (day.date, pair)))
    }

    pub fn matching_count(&self) -> usize {
        self.pairs().filter(|(_, pair)| pair.matching).count()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Default)]
struct DaySides {
    invoices: Vec<DisplayInvoice>,
    receipts: Vec<DisplayReceipt>,
}

/// Build the review table for one user's month.
///
/// Rows are keyed by delivery date and receipts by receipt date. Within a day
/// both sides are sorted by ascending price and paired by position; the shorter
/// side is padded with absent entries. A receipt on the cash account also
/// yields a virtual invoice row so it pairs with itself.
pub fn review_table(
    rows: &[&InvoiceRow],
    receipts: &[&ReceiptRecord],
    cash_account_number: Option<i64>,
) -> ReviewTable {
    let mut days: BTreeMap<NaiveDate, DaySides> = BTreeMap::new();

    for row in rows {
        days.entry(row.delivery_date)
            .or_default()
            .invoices
            .push(DisplayInvoice::from_row(row));
    }

    // Cash purchases have no invoice row, so they get a virtual one
    for receipt in receipts {
        let sides = days.entry(receipt.date).or_default();
        if receipt.is_cash_purchase(cash_account_number) {
            sides.invoices.push(DisplayInvoice::cash_purchase(receipt));
        }
        sides.receipts.push(DisplayReceipt::from(*receipt));
    }

    let days = days
        .into_iter()
        .map(|(date, mut sides)| {
            // Pair by position after sorting both sides by price
            sides.invoices.sort_by_key(|i| i.price);
            sides.receipts.sort_by_key(|r| r.price);

            let len = sides.invoices.len().max(sides.receipts.len());
            let mut invoices = sides.invoices.into_iter();
            let mut receipts = sides.receipts.into_iter();

            let pairs = (0..len)
                .map(|_| {
                    let invoice = invoices.next();
                    let receipt = receipts.next();
                    let matching = match (&invoice, &receipt) {
                        (Some(i), Some(r)) => i.price.is_some() && i.price == r.price,
                        _ => false,
                    };
                    ReviewPair {
                        invoice,
                        receipt,
                        matching,
                    }
                })
                .collect();

            ReviewDay { date, pairs }
        })
        .collect();

    ReviewTable { days }
}
