//! Confirm command - mark a link as verified by a person.

use chrono::Utc;
use clap::Args;
use console::style;

use super::Context;

/// Arguments for the confirm command.
#[derive(Args)]
pub struct ConfirmArgs {
    /// Invoice row identifier
    row_identifier: String,

    /// Name of the person confirming
    #[arg(long)]
    by: String,
}

pub async fn run(args: ConfirmArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (mut ledger, ledger_path) = ctx.open_ledger(&config)?;

    let (changed, link) = ledger.confirm_link(&args.row_identifier, &args.by, Utc::now())?;
    let receipt_id = link.receipt_id;
    let confirmed_by = link.confirmed_by.clone().unwrap_or_default();

    // Confirmed links are immutable, nothing to write
    if !changed {
        println!(
            "{} Link for row {} was already confirmed by {}",
            style("ℹ").blue(),
            args.row_identifier,
            confirmed_by
        );
        return Ok(());
    }

    ledger.save(&ledger_path)?;
    println!(
        "{} Row {} -> receipt {} confirmed by {}",
        style("✓").green(),
        args.row_identifier,
        receipt_id,
        confirmed_by
    );

    Ok(())
}
