//! Labels and line patterns of the card invoice exports.

use lazy_static::lazy_static;
use regex::Regex;

/// Right-column item identifier label.
pub const LABEL_ROW_IDENTIFIER: &str = "Tuotetunnus";

/// Left-column description label.
pub const LABEL_DESCRIPTION: &str = "Kuvaus";

/// Right-column delivery date label (the markup export appends " (jak)").
pub const LABEL_DELIVERY_DATE: &str = "Toimituspvm";

/// Marker opening the left-column free-text block.
pub const LABEL_DETAILS: &str = "Viestit";

/// Right-column row total label.
pub const LABEL_TOTAL: &str = "Yhteensä verollinen";

pub const LABEL_CARD_HOLDER_ID: &str = "Henkilönumero";
pub const LABEL_RECORD_DATE: &str = "Kirjauspvm";
pub const LABEL_CC_CODE: &str = "MCC koodi";

/// Merchant category description; also terminates a free-text block.
pub const LABEL_CC_DESCRIPTION: &str = "MCC selite";

pub const LABEL_FOREIGN_AMOUNT: &str = "Ulkomaan valuutta";
pub const LABEL_EXCHANGE_RATE: &str = "Vaihtokurssi";
pub const LABEL_CARD_HOLDER: &str = "Kortinhaltija";

/// Suffix that terminates a free-text block.
pub const DETAILS_TERMINATOR_SUFFIX: &str = "0000";

/// Page header/footer lines dropped before any other processing.
pub const NOISE_PREFIXES: &[&str] = &[
    "LASKU \u{ad} SEB",
    "LASKU - SEB",
    "https://suomi.netvisor.fi",
];

/// No-break space left behind by the text conversion.
pub const NO_BREAK_SPACE: char = '\u{a0}';

/// Soft hyphen the text conversion emits in place of minus signs and dashes.
pub const SOFT_HYPHEN: char = '\u{ad}';

lazy_static! {
    /// Deferred item identifier: at least ten leading digits.
    pub static ref ROW_IDENTIFIER: Regex = Regex::new(r"^[0-9]{10,}").unwrap();

    /// Deferred row total, e.g. `12,50`.
    pub static ref ROW_PRICE: Regex = Regex::new(r"^[0-9]+,[0-9]{2}").unwrap();

    /// Deferred delivery date, e.g. `5.1.2016`.
    pub static ref DELIVERY_DATE: Regex = Regex::new(r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4}").unwrap();

    /// Date stamp printed at every page break.
    pub static ref PAGE_BREAK_DATE: Regex = Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").unwrap();
}
