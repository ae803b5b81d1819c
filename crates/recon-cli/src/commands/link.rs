//! Link command - automatic linking over the whole ledger.

use chrono::Utc;
use clap::Args;
use console::style;
use tracing::debug;

use recon_core::reconcile::{LinkDecision, LinkReason};
use recon_core::Reconciler;

use super::Context;

/// Arguments for the link command.
#[derive(Args)]
pub struct LinkArgs {
    /// Show the decisions without writing the ledger
    #[arg(long)]
    dry_run: bool,

    /// Print the decision for every row
    #[arg(long)]
    details: bool,
}

pub async fn run(args: LinkArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (mut ledger, ledger_path) = ctx.open_ledger(&config)?;

    let plan = Reconciler::from_config(&config.reconcile).plan(&ledger);

    if args.details || args.dry_run {
        for outcome in &plan.outcomes {
            let decision = match &outcome.decision {
                LinkDecision::KeepConfirmed => style("confirmed, skipped".to_string()).dim(),
                LinkDecision::Link {
                    receipt_id,
                    reason: LinkReason::SingleCandidate,
                } => style(format!("-> receipt {} (only candidate)", receipt_id)).green(),
                LinkDecision::Link {
                    receipt_id,
                    reason: LinkReason::PriceMatch,
                } => style(format!("-> receipt {} (price match)", receipt_id)).green(),
                LinkDecision::Unresolved { candidates } if candidates.is_empty() => {
                    style("no candidates".to_string()).yellow()
                }
                LinkDecision::Unresolved { candidates } => {
                    style(format!("unresolved, {} candidates", candidates.len())).yellow()
                }
            };
            println!("{}  {}", outcome.row_identifier, decision);
        }
    }

    if args.dry_run {
        println!(
            "{} {} rows would be linked (dry run, ledger not written)",
            style("ℹ").blue(),
            plan.linked_count()
        );
        return Ok(());
    }

    let changed = ledger.apply_links(plan.proposals(Utc::now()));
    ledger.save(&ledger_path)?;
    debug!("{} links changed", changed);

    println!(
        "{} Linked {} rows ({} changed), {} confirmed skipped, {} unresolved",
        style("✓").green(),
        plan.linked_count(),
        changed,
        plan.confirmed_count(),
        plan.unresolved_count()
    );

    Ok(())
}
