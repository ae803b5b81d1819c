//! Card invoice parsing module.

mod columnar;
mod import;
mod markup;
pub mod rules;

pub use columnar::ColumnarInvoiceParser;
pub use import::ImportBatch;
pub use markup::MarkupInvoiceParser;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::invoice::InvoiceRow;
use rules::FieldNormalizer;

/// Trait for invoice export parsers.
///
/// A parse either yields every row of the document or fails as a whole.
pub trait InvoiceDocumentParser {
    /// Parse a complete export document into rows, in document order.
    fn parse(&self, input: &str) -> crate::Result<Vec<InvoiceRow>>;
}

/// Supported export layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// HTML export.
    Markup,
    /// Text conversion of the PDF export.
    ColumnarText,
}

impl DocumentFormat {
    /// Pick the format from a file extension: `.html`/`.htm` are markup.
    pub fn from_path(path: &Path) -> Self {
        let is_markup = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));

        if is_markup {
            DocumentFormat::Markup
        } else {
            DocumentFormat::ColumnarText
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DocumentFormat::Markup => "markup",
            DocumentFormat::ColumnarText => "text",
        }
    }

    /// Build the parser for this format.
    pub fn parser(&self, normalizer: FieldNormalizer) -> Box<dyn InvoiceDocumentParser> {
        match self {
            DocumentFormat::Markup => Box::new(MarkupInvoiceParser::new().with_normalizer(normalizer)),
            DocumentFormat::ColumnarText => {
                Box::new(ColumnarInvoiceParser::new().with_normalizer(normalizer))
            }
        }
    }
}
