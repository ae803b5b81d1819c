//! Import command - parse a card invoice export into the ledger.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use recon_core::{DocumentFormat, FieldNormalizer, ImportBatch, InvoiceRow};

use super::Context;

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// Invoice export (HTML, or the text conversion of the PDF)
    #[arg(required = true)]
    file: PathBuf,

    /// Billing year
    #[arg(short, long)]
    year: i32,

    /// Billing month (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,

    /// Export layout
    #[arg(short, long, value_enum, default_value = "auto")]
    format: InputFormat,

    /// Parse and show the rows without writing the ledger
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum InputFormat {
    /// Pick by file extension
    Auto,
    /// HTML export
    Markup,
    /// Text conversion of the PDF export
    Text,
}

impl InputFormat {
    fn resolve(self, file: &std::path::Path) -> DocumentFormat {
        match self {
            InputFormat::Auto => DocumentFormat::from_path(file),
            InputFormat::Markup => DocumentFormat::Markup,
            InputFormat::Text => DocumentFormat::ColumnarText,
        }
    }
}

pub async fn run(args: ImportArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = ctx.load_config()?;

    if !args.file.exists() {
        anyhow::bail!("Input file not found: {}", args.file.display());
    }

    let format = args.format.resolve(&args.file);
    info!("Importing {} as {} export", args.file.display(), format.name());

    let input = fs::read_to_string(&args.file)?;
    let parser = format.parser(FieldNormalizer::from_config(&config.import));
    let batch = ImportBatch::new(args.year, args.month)?;

    if args.dry_run {
        let rows = batch.parse(parser.as_ref(), &input).inspect_err(|_| report_failure(&args))?;
        print_rows(&rows);
        println!(
            "{} Parsed {} rows from {} (dry run, ledger not written)",
            style("ℹ").blue(),
            rows.len(),
            args.file.display()
        );
        return Ok(());
    }

    // Nothing is written unless the whole document parses
    let (mut ledger, ledger_path) = ctx.open_ledger(&config)?;
    let count = batch
        .run(parser.as_ref(), &input, &mut ledger)
        .inspect_err(|_| report_failure(&args))?;
    ledger.save(&ledger_path)?;

    println!(
        "{} Imported {} rows from {}",
        style("✓").green(),
        count,
        args.file.display()
    );
    debug!("Import took {:?}", start.elapsed());

    Ok(())
}

fn report_failure(args: &ImportArgs) {
    eprintln!(
        "{} Imported 0 rows from {}",
        style("✗").red(),
        args.file.display()
    );
}

fn print_rows(rows: &[InvoiceRow]) {
    for row in rows {
        let price = row.row_price.map(|p| p.to_string()).unwrap_or_default();
        println!(
            "{}  {}  {:>10}  {:<30}  {}",
            row.row_identifier,
            row.delivery_date,
            price,
            row.description,
            row.card_holder_email_guess
        );
    }
}
