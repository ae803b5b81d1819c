//! Reconciliation of invoice rows against receipts.
//!
//! [`Reconciler`] decides automatic links per row, [`review_table`] pairs rows
//! and receipts per day for manual review, and [`month_issues`] lists what each
//! card holder has to fix for a billing month.

mod issues;
mod linker;
mod review;

pub use issues::{month_issues, Issue, UserIssues};
pub use linker::{LinkDecision, LinkPlan, LinkReason, Reconciler, RowOutcome, DEFAULT_DATE_TOLERANCE_DAYS};
pub use review::{
    review_table, DisplayInvoice, DisplayReceipt, ReviewDay, ReviewPair, ReviewTable,
    CASH_PURCHASE_DESCRIPTION,
};
