//! Import of one billing month's invoice export.

use chrono::NaiveDate;
use tracing::info;

use super::InvoiceDocumentParser;
use crate::error::FormatError;
use crate::ledger::Ledger;
use crate::models::invoice::InvoiceRow;

/// Rows of one export, stamped with their billing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportBatch {
    invoice_date: NaiveDate,
}

impl ImportBatch {
    pub fn new(year: i32, month: u32) -> crate::Result<Self> {
        let invoice_date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| FormatError::new("invoice_date", format!("{}-{}", year, month)))?;
        Ok(Self { invoice_date })
    }

    /// First day of the billing month.
    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    /// Parse a document and assign the billing month to every row.
    pub fn parse(&self, parser: &dyn InvoiceDocumentParser, input: &str) -> crate::Result<Vec<InvoiceRow>> {
        let mut rows = parser.parse(input)?;
        for row in &mut rows {
            row.invoice_date = Some(self.invoice_date);
        }
        Ok(rows)
    }

    /// Parse and upsert into the ledger. Nothing is written if parsing fails.
    pub fn run(
        &self,
        parser: &dyn InvoiceDocumentParser,
        input: &str,
        ledger: &mut Ledger,
    ) -> crate::Result<usize> {
        let rows = self.parse(parser, input)?;
        let count = ledger.upsert_rows(rows);
        info!("Imported {} rows for invoice month {}", count, self.invoice_date.format("%Y-%m"));
        Ok(count)
    }
}
