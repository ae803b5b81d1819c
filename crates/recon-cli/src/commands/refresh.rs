//! Refresh command - fetch receipts from the provider into the ledger.

use chrono::Local;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use recon_core::{RefreshWindow, RetryingProvider};

use super::Context;
use crate::provider::HttpReceiptProvider;

/// Arguments for the refresh command.
#[derive(Args)]
pub struct RefreshArgs {
    /// User e-mail addresses to refresh
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    users: Vec<String>,

    /// Refresh every known user
    #[arg(long)]
    all: bool,
}

pub async fn run(args: RefreshArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (mut ledger, ledger_path) = ctx.open_ledger(&config)?;

    let provider = RetryingProvider::new(HttpReceiptProvider::from_config(&config.provider)?)
        .with_max_retries(config.provider.max_auth_retries);
    let window = RefreshWindow::from_config(&config.reconcile, Local::now().date_naive());

    println!(
        "{} Fetching receipts dated {} to {}",
        style("ℹ").blue(),
        window.start,
        window.end
    );

    if !args.all {
        for user in &args.users {
            let count = provider.refresh_user(&mut ledger, user, window).await?;
            ledger.save(&ledger_path)?;
            println!(
                "{} Refreshed {} receipts for user \"{}\"",
                style("✓").green(),
                count,
                user
            );
        }
        return Ok(());
    }

    // Refresh everyone, one failing user does not stop the rest
    let users = ledger.known_users();
    let pb = ProgressBar::new(users.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} users {msg}")?
            .progress_chars("=>-"),
    );

    let mut total = 0;
    let mut failed = Vec::new();
    for user in &users {
        pb.set_message(user.clone());
        match provider.refresh_user(&mut ledger, user, window).await {
            Ok(count) => total += count,
            Err(e) => {
                warn!("Failed to refresh receipts for {}: {}", user, e);
                failed.push(user.as_str());
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Complete");

    ledger.save(&ledger_path)?;

    println!(
        "{} Refreshed {} receipts for {} users",
        style("✓").green(),
        total,
        users.len() - failed.len()
    );
    if !failed.is_empty() {
        println!("{} Failed: {}", style("⚠").yellow(), failed.join(", "));
    }

    Ok(())
}
