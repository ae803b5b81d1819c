//! Error types for the recon-core library.

use thiserror::Error;

/// Main error type for the recon library.
#[derive(Error, Debug)]
pub enum ReconError {
    /// A field value could not be parsed.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The document did not have the expected shape.
    #[error("structural parse error: {0}")]
    Structure(#[from] StructuralParseError),

    /// The receipt provider failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Ledger or config (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A ledger entry the operation needs does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// A malformed numeric, date or identifier value.
///
/// Aborts the whole document: no rows are emitted for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse {field} from {value:?}")]
pub struct FormatError {
    /// Canonical attribute being parsed.
    pub field: &'static str,
    /// Raw value as found in the document.
    pub value: String,
}

impl FormatError {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Errors caused by documents that do not follow the expected layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralParseError {
    /// A required element is missing from a markup row.
    #[error("missing element {element} in row {row}")]
    MissingElement { element: &'static str, row: usize },

    /// A parsed record lacks a required attribute.
    #[error("record {index} is missing required field {field}")]
    MissingField { field: &'static str, index: usize },

    /// Left and right column entry counts differ.
    #[error("column mismatch: {left} item detail blocks, {right} row totals")]
    ColumnMismatch { left: usize, right: usize },

    /// A deferred value or block was still open at end of input.
    #[error("unterminated {0} at end of input")]
    Unterminated(&'static str),
}

/// Errors reported by the receipt provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The access token was rejected.
    #[error("authentication expired")]
    AuthExpired,

    /// Authentication failed outright.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Still unauthenticated after the allowed number of retries.
    #[error("giving up after {0} authentication retries")]
    RetriesExhausted(u32),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Schema(String),

    /// Network or HTTP failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for the recon library.
pub type Result<T> = std::result::Result<T, ReconError>;
