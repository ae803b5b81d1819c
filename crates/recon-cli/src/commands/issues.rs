//! Issues command - what each card holder has to fix for a billing month.

use clap::Args;
use console::style;

use recon_core::{month_issues, UserIssues};

use super::Context;

/// Arguments for the issues command.
#[derive(Args)]
pub struct IssuesArgs {
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
    /// One block per user
    Text,
    /// JSON output
    Json,
}

pub async fn run(args: IssuesArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (ledger, _) = ctx.open_ledger(&config)?;

    let issues = month_issues(&ledger, args.year, args.month);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
        OutputFormat::Text => print!("{}", format_text(&issues, &args)),
    }

    Ok(())
}

fn format_text(issues: &[UserIssues], args: &IssuesArgs) -> String {
    if issues.is_empty() {
        return format!(
            "{} No issues for {}-{:02}\n",
            style("✓").green(),
            args.year,
            args.month
        );
    }

    let mut output = String::new();
    for user in issues {
        output.push_str(&format!("{}\n", style(&user.user).bold()));
        for issue in &user.issues {
            output.push_str(&format!("  {} {}\n", style("⚠").yellow(), issue));
        }
    }
    output.push_str(&format!(
        "\n{} users with issues in {}-{:02}\n",
        issues.len(),
        args.year,
        args.month
    ));

    output
}
