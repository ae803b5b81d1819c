//! Review command - a user's month, invoice rows next to receipts.

use clap::Args;
use console::style;
use rust_decimal::Decimal;

use recon_core::reconcile::ReviewPair;
use recon_core::{review_table, ReviewTable};

use super::Context;

/// Arguments for the review command.
#[derive(Args)]
pub struct ReviewArgs {
    /// User e-mail address
    #[arg(required = true)]
    user: String,

    /// Billing year
    #[arg(short, long)]
    year: i32,

    /// Billing month (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text table
    Text,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

pub async fn run(args: ReviewArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (ledger, _) = ctx.open_ledger(&config)?;

    let rows = ledger.rows_for_month(&args.user, args.year, args.month);
    let receipts = ledger.receipts_for_month(&args.user, args.year, args.month);
    let table = review_table(&rows, &receipts, config.reconcile.cash_account_number);

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&table)?,
        OutputFormat::Csv => format_csv(&table)?,
        OutputFormat::Text => format_text(&table, &args),
    };
    print!("{}", output);

    Ok(())
}

fn price(value: Option<Decimal>) -> String {
    value.map(|p| p.to_string()).unwrap_or_default()
}

fn format_csv(table: &ReviewTable) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "row_identifier",
        "invoice_description",
        "invoice_price",
        "receipt_id",
        "receipt_description",
        "receipt_price",
        "matching",
    ])?;

    for (date, pair) in table.pairs() {
        let invoice = pair.invoice.as_ref();
        let receipt = pair.receipt.as_ref();
        wtr.write_record([
            date.to_string(),
            invoice.and_then(|i| i.row_identifier.clone()).unwrap_or_default(),
            invoice.map(|i| i.description.clone()).unwrap_or_default(),
            price(invoice.and_then(|i| i.price)),
            receipt.map(|r| r.id.to_string()).unwrap_or_default(),
            receipt.and_then(|r| r.description.clone()).unwrap_or_default(),
            price(receipt.and_then(|r| r.price)),
            pair.matching.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_pair(pair: &ReviewPair) -> String {
    let invoice = match &pair.invoice {
        Some(i) => format!("{:>10}  {:<32}", price(i.price), truncate(&i.description, 32)),
        None => format!("{:>10}  {:<32}", "", style("(no invoice row)").dim()),
    };
    let receipt = match &pair.receipt {
        Some(r) => format!(
            "{:>10}  {}",
            price(r.price),
            truncate(r.description.as_deref().unwrap_or("#"), 32)
        ),
        None => format!("{:>10}  {}", "", style("(no receipt)").dim()),
    };
    let marker = if pair.matching {
        style("✓").green()
    } else {
        style("·").yellow()
    };
    format!("  {} {} | {}", marker, invoice, receipt)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

fn format_text(table: &ReviewTable, args: &ReviewArgs) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {}-{:02}\n\n",
        style(&args.user).bold(),
        args.year,
        args.month
    ));

    if table.is_empty() {
        output.push_str("No invoice rows or receipts.\n");
        return output;
    }

    for day in &table.days {
        output.push_str(&format!("{}\n", style(day.date).cyan()));
        for pair in &day.pairs {
            output.push_str(&format_pair(pair));
            output.push('\n');
        }
    }

    let total = table.pairs().count();
    output.push_str(&format!(
        "\n{} of {} pairs matching\n",
        table.matching_count(),
        total
    ));

    output
}
