//! CLI application for card invoice import and receipt reconciliation.

mod commands;
mod provider;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, confirm, import, issues, link, receipt, refresh, review, users, Context};

/// Card receipt reconciliation - import invoices, fetch receipts, link them
#[derive(Parser)]
#[command(name = "recon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to ledger file (overrides the configured one)
    #[arg(short, long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a card invoice export for one billing month
    Import(import::ImportArgs),

    /// Fetch receipts from the receipt provider
    Refresh(refresh::RefreshArgs),

    /// Fetch a single receipt from the receipt provider
    Receipt(receipt::ReceiptArgs),

    /// Link invoice rows to receipts automatically
    Link(link::LinkArgs),

    /// Show a user's invoice rows and receipts side by side
    Review(review::ReviewArgs),

    /// List known users
    Users,

    /// List what card holders have to fix for a billing month
    Issues(issues::IssuesArgs),

    /// Mark a row's link as verified
    Confirm(confirm::ConfirmArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = Context::new(cli.config, cli.ledger);

    // Execute command
    match cli.command {
        Commands::Import(args) => import::run(args, &ctx).await,
        Commands::Refresh(args) => refresh::run(args, &ctx).await,
        Commands::Receipt(args) => receipt::run(args, &ctx).await,
        Commands::Link(args) => link::run(args, &ctx).await,
        Commands::Review(args) => review::run(args, &ctx).await,
        Commands::Users => users::run(&ctx).await,
        Commands::Issues(args) => issues::run(args, &ctx).await,
        Commands::Confirm(args) => confirm::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
