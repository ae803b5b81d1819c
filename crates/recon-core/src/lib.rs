//! Core library for card invoice parsing and receipt reconciliation.
//!
//! This crate provides:
//! - Field normalization shared by both invoice export formats
//! - A markup (HTML) export parser and a columnar text export parser
//! - A file-backed ledger with keyed upserts and immutable confirmed links
//! - The receipt provider contract with bounded re-authentication
//! - Automatic linking, a per-day review table and monthly discrepancy checks

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod models;
pub mod provider;
pub mod reconcile;

pub use error::{FormatError, ProviderError, ReconError, Result, StructuralParseError};
pub use invoice::rules::{EmailGuesser, FieldNormalizer};
pub use invoice::{
    ColumnarInvoiceParser, DocumentFormat, ImportBatch, InvoiceDocumentParser, MarkupInvoiceParser,
};
pub use ledger::Ledger;
pub use models::config::ReconConfig;
pub use models::invoice::{Attribute, InvoiceRow, RowDraft};
pub use models::receipt::{Link, ReceiptRecord, ReceiptState};
pub use provider::{RawPrice, RawReceipt, ReceiptProvider, RefreshWindow, RetryingProvider};
pub use reconcile::{month_issues, review_table, LinkDecision, LinkPlan, Reconciler, ReviewTable, UserIssues};
