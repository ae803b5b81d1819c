//! Receipt command - fetch a single receipt from the provider.

use clap::Args;
use console::style;

use recon_core::RetryingProvider;

use super::Context;
use crate::provider::HttpReceiptProvider;

/// Arguments for the receipt command.
#[derive(Args)]
pub struct ReceiptArgs {
    /// Provider receipt id
    id: u64,

    /// Owner e-mail address (defaults to the stored owner or the uploader)
    #[arg(short, long)]
    user: Option<String>,
}

pub async fn run(args: ReceiptArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (mut ledger, ledger_path) = ctx.open_ledger(&config)?;

    let provider = RetryingProvider::new(HttpReceiptProvider::from_config(&config.provider)?)
        .with_max_retries(config.provider.max_auth_retries);

    let Some(record) = provider
        .refresh_receipt(&mut ledger, args.id, args.user.as_deref())
        .await?
    else {
        anyhow::bail!("Receipt {} not found at the provider", args.id);
    };
    ledger.save(&ledger_path)?;

    println!("{} Receipt {}", style("✓").green(), record.id);
    println!("  Owner:       {}", record.owner);
    println!("  Date:        {}", record.date);
    println!(
        "  Price:       {}",
        record.price.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  Description: {}", record.description.as_deref().unwrap_or("-"));
    println!("  State:       {}", String::from(record.state.clone()));
    if let Some(account) = record.account_number {
        println!("  Account:     {}", account);
    }
    if let Some(filename) = &record.filename {
        println!("  File:        {}", filename);
    }

    Ok(())
}
