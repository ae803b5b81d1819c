//! Parser for the converted-text card invoice export.
//!
//! The text conversion of the two-column PDF emits the left column ("item
//! detail": description and a free-text block) and the right column (item
//! identifier, delivery date, row total) as separate runs of lines. A label
//! whose value line is blank defers the value to a later line, possibly on the
//! next page. Left and right entries are collected into two sequences and
//! joined by position once the whole document has been read.

use std::mem;

use tracing::{debug, info, trace};

use super::rules::{
    clean_text, parse_day_first_date, parse_price, parse_row_identifier, FieldNormalizer,
    DELIVERY_DATE, DETAILS_TERMINATOR_SUFFIX, LABEL_CC_DESCRIPTION, LABEL_DELIVERY_DATE,
    LABEL_DESCRIPTION, LABEL_DETAILS, LABEL_ROW_IDENTIFIER, LABEL_TOTAL, NOISE_PREFIXES,
    PAGE_BREAK_DATE, ROW_IDENTIFIER, ROW_PRICE,
};
use super::InvoiceDocumentParser;
use crate::error::StructuralParseError;
use crate::models::invoice::{Attribute, InvoiceRow, RowDraft};

/// Pending work in the left column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeftColumn {
    Idle,
    /// Description label seen, value still to come; the free-text block follows it.
    AwaitingDescription,
    /// Free-text block opened but not terminated.
    AwaitingDetails,
}

/// A right-column value announced by a label with a blank value line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RightField {
    Identifier,
    DeliveryDate,
    RowPrice,
}

impl RightField {
    fn name(self) -> &'static str {
        match self {
            RightField::Identifier => "row_identifier",
            RightField::DeliveryDate => "delivery_date",
            RightField::RowPrice => "row_price",
        }
    }
}

/// Cursor over the document lines with page noise removed.
struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().collect(),
            pos: 0,
        }
    }

    /// Next trimmed line that is not page noise; `None` at end of input.
    fn next_content(&mut self) -> Option<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;
            if NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
                continue;
            }
            return Some(line);
        }
        None
    }

    fn next_non_blank(&mut self) -> Option<&'a str> {
        while let Some(line) = self.next_content() {
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Next line if it carries a value; blank lines and end of input defer it.
    fn next_value(&mut self) -> Option<&'a str> {
        self.next_content().filter(|line| !line.is_empty())
    }
}

fn ends_details_block(line: &str) -> bool {
    line.starts_with(LABEL_CC_DESCRIPTION) || line.ends_with(DETAILS_TERMINATOR_SUFFIX)
}

/// Scan state for one document.
struct ColumnScan<'n> {
    normalizer: &'n FieldNormalizer,
    left_state: LeftColumn,
    awaiting: Vec<RightField>,
    left_open: Vec<Attribute>,
    right_open: Vec<Attribute>,
    left_entries: Vec<Vec<Attribute>>,
    right_entries: Vec<Vec<Attribute>>,
}

impl<'n> ColumnScan<'n> {
    fn new(normalizer: &'n FieldNormalizer) -> Self {
        Self {
            normalizer,
            left_state: LeftColumn::Idle,
            awaiting: Vec::new(),
            left_open: Vec::new(),
            right_open: Vec::new(),
            left_entries: Vec::new(),
            right_entries: Vec::new(),
        }
    }

    fn run(&mut self, lines: &mut Lines<'_>) -> crate::Result<()> {
        while let Some(line) = lines.next_content() {
            // Left column: description and free-text block
            if line == LABEL_DESCRIPTION {
                self.description(lines)?;
            } else if line == LABEL_DETAILS {
                self.details(lines)?;
            } else if line == LABEL_ROW_IDENTIFIER {
                // Right column: a blank value line defers the field
                match lines.next_value() {
                    Some(value) => self.right_open.push(Attribute::RowIdentifier(parse_row_identifier(value)?)),
                    None => self.await_field(RightField::Identifier),
                }
            } else if line.starts_with(LABEL_DELIVERY_DATE) {
                match lines.next_value() {
                    Some(value) => self.push_delivery_date(value)?,
                    None => self.await_field(RightField::DeliveryDate),
                }
            } else if line == LABEL_TOTAL {
                match lines.next_value() {
                    Some(value) => self.close_right(value)?,
                    None => self.await_field(RightField::RowPrice),
                }
            } else if PAGE_BREAK_DATE.is_match(line) {
                // New page: the left column may continue an open block
                debug!("Page break at {}", line);
                self.resume_left(lines)?;
            } else if self.is_awaiting(RightField::Identifier) && ROW_IDENTIFIER.is_match(line) {
                // Deferred right-column values arrive later, out of place
                self.deferred_identifier(line)?;
            } else if self.is_awaiting(RightField::DeliveryDate) && DELIVERY_DATE.is_match(line) {
                debug!("Deferred delivery date {}", line);
                self.push_delivery_date(line)?;
                self.resolve(RightField::DeliveryDate);
            } else if self.is_awaiting(RightField::RowPrice) && ROW_PRICE.is_match(line) {
                debug!("Deferred row total {}", line);
                self.close_right(line)?;
                self.resolve(RightField::RowPrice);
            } else {
                trace!("Discarding leftover line {:?}", line);
            }
        }

        self.finish_scan()
    }

    fn description(&mut self, lines: &mut Lines<'_>) -> crate::Result<()> {
        if self.left_state != LeftColumn::Idle {
            return Err(StructuralParseError::Unterminated(self.left_name()).into());
        }
        match lines.next_value() {
            Some(value) => self.left_open.push(Attribute::Description(clean_text(value))),
            None => {
                debug!("Description deferred");
                self.left_state = LeftColumn::AwaitingDescription;
            }
        }
        Ok(())
    }

    fn details(&mut self, lines: &mut Lines<'_>) -> crate::Result<()> {
        if self.left_state == LeftColumn::AwaitingDescription {
            return Err(StructuralParseError::Unterminated("description").into());
        }
        self.left_state = LeftColumn::AwaitingDetails;

        // A blank line before the terminator leaves the block open for the next page
        while let Some(line) = lines.next_value() {
            self.detail_line(line)?;
            if ends_details_block(line) {
                self.close_left();
                return Ok(());
            }
        }

        debug!("Free-text block left open");
        Ok(())
    }

    /// Complete a left-column block interrupted by a page break.
    fn resume_left(&mut self, lines: &mut Lines<'_>) -> crate::Result<()> {
        // Description first, then the details it precedes
        if self.left_state == LeftColumn::AwaitingDescription {
            let line = lines
                .next_non_blank()
                .ok_or(StructuralParseError::Unterminated("description"))?;
            debug!("Deferred description {}", line);
            self.left_open.push(Attribute::Description(clean_text(line)));
            self.left_state = LeftColumn::AwaitingDetails;
        }

        if self.left_state == LeftColumn::AwaitingDetails {
            let mut next = lines.next_non_blank();
            loop {
                let line = next.ok_or(StructuralParseError::Unterminated("item details"))?;
                self.detail_line(line)?;
                if ends_details_block(line) {
                    break;
                }
                next = lines.next_content();
            }
            debug!("Free-text block continued across page break");
            self.close_left();
        }

        Ok(())
    }

    fn detail_line(&mut self, line: &str) -> crate::Result<()> {
        let line = clean_text(line);
        if line.len() < 4 || line == LABEL_DETAILS {
            return Ok(());
        }
        match line.split_once(':') {
            Some((label, value)) => self.left_open.extend(self.normalizer.normalize(label, value)?),
            None => trace!("Ignoring free-text line without label {:?}", line),
        }
        Ok(())
    }

    fn deferred_identifier(&mut self, line: &str) -> crate::Result<()> {
        let mut parts = line.split_whitespace();
        // Identifier and delivery date can share one line
        if let (Some(identifier), Some(date)) = (parts.next(), parts.next()) {
            debug!("Deferred identifier {} with delivery date {}", identifier, date);
            self.right_open.push(Attribute::RowIdentifier(parse_row_identifier(identifier)?));
            self.push_delivery_date(date)?;
            self.resolve(RightField::DeliveryDate);
        } else {
            debug!("Deferred identifier {}", line);
            self.right_open.push(Attribute::RowIdentifier(parse_row_identifier(line)?));
        }
        self.resolve(RightField::Identifier);
        Ok(())
    }

    fn push_delivery_date(&mut self, value: &str) -> crate::Result<()> {
        self.right_open.push(Attribute::DeliveryDate(parse_day_first_date("delivery_date", value)?));
        Ok(())
    }

    fn close_left(&mut self) {
        self.left_entries.push(mem::take(&mut self.left_open));
        self.left_state = LeftColumn::Idle;
    }

    /// Store the row total and complete the right-column entry.
    fn close_right(&mut self, value: &str) -> crate::Result<()> {
        self.right_open.push(Attribute::RowPrice(parse_price("row_price", value)?));
        self.right_entries.push(mem::take(&mut self.right_open));
        Ok(())
    }

    fn await_field(&mut self, field: RightField) {
        debug!("{} deferred", field.name());
        if !self.is_awaiting(field) {
            self.awaiting.push(field);
        }
    }

    fn is_awaiting(&self, field: RightField) -> bool {
        self.awaiting.contains(&field)
    }

    fn resolve(&mut self, field: RightField) {
        self.awaiting.retain(|f| *f != field);
    }

    fn left_name(&self) -> &'static str {
        match self.left_state {
            LeftColumn::AwaitingDescription => "description",
            _ => "item details",
        }
    }

    fn finish_scan(&self) -> crate::Result<()> {
        if self.left_state != LeftColumn::Idle || !self.left_open.is_empty() {
            return Err(StructuralParseError::Unterminated(self.left_name()).into());
        }
        if let Some(field) = self.awaiting.first() {
            return Err(StructuralParseError::Unterminated(field.name()).into());
        }
        if !self.right_open.is_empty() {
            return Err(StructuralParseError::Unterminated("row total").into());
        }
        Ok(())
    }

    /// Join left entry `i` with right entry `i`.
    fn into_rows(self) -> crate::Result<Vec<InvoiceRow>> {
        if self.left_entries.len() != self.right_entries.len() {
            return Err(StructuralParseError::ColumnMismatch {
                left: self.left_entries.len(),
                right: self.right_entries.len(),
            }
            .into());
        }

        let rows = self
            .left_entries
            .into_iter()
            .zip(self.right_entries)
            .enumerate()
            .map(|(index, (left, right))| {
                let mut draft = RowDraft::new();
                draft.extend(left);
                draft.extend(right);
                draft.finish(index)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// State-machine parser for the converted-text export.
#[derive(Debug, Clone, Default)]
pub struct ColumnarInvoiceParser {
    normalizer: FieldNormalizer,
}

impl ColumnarInvoiceParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(mut self, normalizer: FieldNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }
}

impl InvoiceDocumentParser for ColumnarInvoiceParser {
    fn parse(&self, input: &str) -> crate::Result<Vec<InvoiceRow>> {
        let mut lines = Lines::new(input);
        let mut scan = ColumnScan::new(&self.normalizer);
        scan.run(&mut lines)?;

        debug!(
            "Collected {} left and {} right column entries",
            scan.left_entries.len(),
            scan.right_entries.len()
        );

        let rows = scan.into_rows()?;
        info!("Parsed {} invoice rows from text export", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormatError, ReconError};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn parse(text: &str) -> crate::Result<Vec<InvoiceRow>> {
        ColumnarInvoiceParser::new().parse(text)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SINGLE_PAGE: &str = "\
LASKU \u{ad} SEB Kortit
Kuvaus
RAVINTOLA LOUNAS
Viestit
Kirjauspvm: 2016\u{ad}01\u{ad}07
Henkilönumero: 0042
Kortinhaltija: 4100/MATTI MEIKÄLÄINEN
MCC koodi: 5812
MCC selite: Ravintolat
Kuvaus
AMAZON WEB SERVICES
Viestit
Kirjauspvm: 2016-01-08
Kortinhaltija: MATTI MEIKÄLÄINEN
Ulkomaan valuutta: 12,99 USD
Vaihtokurssi: 1,0000000
Tuotetunnus
1000000001
Toimituspvm (jak)
05.01.2016
Yhteensä verollinen
12,50
Tuotetunnus
1000000002
Toimituspvm (jak)
06.01.2016
Yhteensä verollinen
12,99
https://suomi.netvisor.fi/print
";

    #[test]
    fn test_single_page_rows() {
        let rows = parse(SINGLE_PAGE).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.row_identifier, "1000000001");
        assert_eq!(first.description, "RAVINTOLA LOUNAS");
        assert_eq!(first.record_date, Some(date(2016, 1, 7)));
        assert_eq!(first.card_holder_id.as_deref(), Some("0042"));
        assert_eq!(first.card_holder, "MATTI MEIKÄLÄINEN");
        assert_eq!(first.card_holder_email_guess, "matti.meikalainen@solinor.com");
        assert_eq!(first.cc_code, "5812");
        assert_eq!(first.cc_description, "Ravintolat");
        assert_eq!(first.delivery_date, date(2016, 1, 5));
        assert_eq!(first.row_price, Some(Decimal::new(1250, 2)));

        let second = &rows[1];
        assert_eq!(second.row_identifier, "1000000002");
        assert_eq!(second.description, "AMAZON WEB SERVICES");
        assert_eq!(second.foreign_currency, Some(Decimal::new(1299, 2)));
        assert_eq!(second.foreign_currency_name.as_deref(), Some("USD"));
        assert_eq!(second.foreign_currency_rate, Some(1.0));
        assert_eq!(second.delivery_date, date(2016, 1, 6));
    }

    #[test]
    fn test_free_text_block_spanning_page_break_is_one_record() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
Kirjauspvm: 2016-01-07
Kortinhaltija: MATTI MEIKÄLÄINEN

https://suomi.netvisor.fi/print
05/02/2016

MCC koodi: 5812
MCC selite: Ravintolat
Tuotetunnus
1000000001
Toimituspvm
05.01.2016
Yhteensä verollinen
12,50
";
        let rows = parse(text).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.card_holder, "MATTI MEIKÄLÄINEN");
        assert_eq!(row.record_date, Some(date(2016, 1, 7)));
        assert_eq!(row.cc_code, "5812");
        assert_eq!(row.cc_description, "Ravintolat");
    }

    #[test]
    fn test_description_deferred_across_page_break() {
        let text = "\
Kuvaus

05/02/2016

TAXI HELSINKI
Viestit
Kortinhaltija: MATTI MEIKÄLÄINEN
MCC selite: Taksit
Tuotetunnus
1000000001
Toimituspvm
05.01.2016
Yhteensä verollinen
21,40
";
        let rows = parse(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "TAXI HELSINKI");
        assert_eq!(rows[0].cc_description, "Taksit");
    }

    #[test]
    fn test_deferred_right_column_values() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
MCC selite: Ravintolat
Tuotetunnus

Toimituspvm

Yhteensä verollinen

1000000001 05.01.2016
12,50
";
        let rows = parse(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_identifier, "1000000001");
        assert_eq!(rows[0].delivery_date, date(2016, 1, 5));
        assert_eq!(rows[0].row_price, Some(Decimal::new(1250, 2)));
    }

    #[test]
    fn test_deferred_values_on_separate_lines() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
MCC selite: Ravintolat
Tuotetunnus

Toimituspvm

unrelated line
1000000001
5.1.2016
Yhteensä verollinen
12,50
";
        let rows = parse(text).unwrap();
        assert_eq!(rows[0].row_identifier, "1000000001");
        assert_eq!(rows[0].delivery_date, date(2016, 1, 5));
    }

    #[test]
    fn test_noise_between_label_and_value() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
MCC selite: Ravintolat
Tuotetunnus
LASKU \u{ad} SEB Kortit
1000000001
Toimituspvm
05.01.2016
Yhteensä verollinen
12,50
";
        let rows = parse(text).unwrap();
        assert_eq!(rows[0].row_identifier, "1000000001");
    }

    #[test]
    fn test_column_count_mismatch() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
MCC selite: Ravintolat
";
        assert!(matches!(
            parse(text),
            Err(ReconError::Structure(StructuralParseError::ColumnMismatch { left: 1, right: 0 }))
        ));
    }

    #[test]
    fn test_open_block_at_end_of_input() {
        let text = "\
Kuvaus
RAVINTOLA LOUNAS
Viestit
Kortinhaltija: MATTI MEIKÄLÄINEN
";
        assert!(matches!(
            parse(text),
            Err(ReconError::Structure(StructuralParseError::Unterminated("item details")))
        ));
    }

    #[test]
    fn test_malformed_price_aborts_document() {
        let text = SINGLE_PAGE.replace("12,99\nhttps", "12,x9\nhttps");

        match parse(&text) {
            Err(ReconError::Format(err)) => assert_eq!(err, FormatError::new("row_price", "12,x9")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_reparse_is_stable() {
        assert_eq!(parse(SINGLE_PAGE).unwrap(), parse(SINGLE_PAGE).unwrap());
    }
}
