//! Parser for the markup (HTML) card invoice export.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::rules::{parse_price, FieldNormalizer};
use super::InvoiceDocumentParser;
use crate::error::StructuralParseError;
use crate::models::invoice::{InvoiceRow, RowDraft};

lazy_static! {
    static ref TABLE_ROW: Selector = Selector::parse("tr").unwrap();
    static ref MULTI_DATA: Selector = Selector::parse("td.multiData").unwrap();
    static ref TITLE: Selector = Selector::parse(".title").unwrap();
    static ref DATA: Selector = Selector::parse(".data").unwrap();
    static ref ROW_AMOUNT: Selector = Selector::parse(".RowAmount").unwrap();
}

/// Kind of table row, from its class tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Details,
    FreeText,
    Other,
}

fn classify(row: &ElementRef<'_>) -> RowKind {
    let classes: Vec<&str> = row.value().classes().collect();
    if !classes.contains(&"InvoiceRow") {
        return RowKind::Other;
    }

    if classes.contains(&"details") {
        RowKind::Details
    } else if classes.contains(&"freeText") {
        RowKind::FreeText
    } else {
        RowKind::Other
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Walks the table rows of a markup export.
///
/// A `details` row opens a record; `freeText` rows add to the open record.
#[derive(Debug, Clone, Default)]
pub struct MarkupInvoiceParser {
    normalizer: FieldNormalizer,
}

impl MarkupInvoiceParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(mut self, normalizer: FieldNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Parse an already built document tree.
    pub fn parse_document(&self, document: &Html) -> crate::Result<Vec<InvoiceRow>> {
        let mut drafts = Vec::new();
        let mut open: Option<RowDraft> = None;

        for (index, row) in document.select(&TABLE_ROW).enumerate() {
            match classify(&row) {
                RowKind::Details => {
                    // A details row starts a new record
                    if let Some(draft) = open.take().filter(|d| !d.is_empty()) {
                        drafts.push(draft);
                    }
                    open = Some(self.details_row(&row, index)?);
                }
                RowKind::FreeText => match open.as_mut() {
                    Some(draft) => self.free_text_row(&row, draft)?,
                    None => warn!("Free-text row {} precedes any details row, ignoring", index),
                },
                RowKind::Other => {}
            }
        }

        if let Some(draft) = open.filter(|d| !d.is_empty()) {
            drafts.push(draft);
        }

        debug!("Collected {} records from markup", drafts.len());

        let rows = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.finish(index))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Parsed {} invoice rows from markup export", rows.len());
        Ok(rows)
    }

    fn details_row(&self, row: &ElementRef<'_>, index: usize) -> crate::Result<RowDraft> {
        let mut draft = RowDraft::new();

        for cell in row.select(&MULTI_DATA) {
            let (Some(title), Some(data)) = (cell.select(&TITLE).next(), cell.select(&DATA).next())
            else {
                continue;
            };
            draft.extend(self.normalizer.normalize(&element_text(&title), &element_text(&data))?);
        }

        // Amount sits outside the multiData cells
        let amount = row
            .select(&ROW_AMOUNT)
            .next()
            .and_then(|cell| cell.select(&DATA).next())
            .ok_or(StructuralParseError::MissingElement {
                element: "RowAmount",
                row: index,
            })?;
        draft.row_price = Some(parse_price("row_price", &element_text(&amount))?);

        Ok(draft)
    }

    fn free_text_row(&self, row: &ElementRef<'_>, draft: &mut RowDraft) -> crate::Result<()> {
        let Some(data) = row.select(&DATA).next() else {
            return Ok(());
        };

        for fragment in data.text().flat_map(|node| node.split('\n')) {
            if let Some((label, value)) = fragment.split_once(": ") {
                draft.extend(self.normalizer.normalize(label, value)?);
            }
        }
        Ok(())
    }
}

impl InvoiceDocumentParser for MarkupInvoiceParser {
    fn parse(&self, input: &str) -> crate::Result<Vec<InvoiceRow>> {
        self.parse_document(&Html::parse_document(input))
    }
}
