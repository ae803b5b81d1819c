//! Config command - manage configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use recon_core::ReconConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "reconcile.date_tolerance_days")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init(init_args) => init_config(init_args, ctx),
        ConfigCommand::Get { key } => get_config(&key, ctx),
        ConfigCommand::Set { key, value } => set_config(&key, &value, ctx),
        ConfigCommand::Path => show_path(ctx),
    }
}

/// File contents only; environment overrides are not shown or persisted.
fn load_file_config(ctx: &Context) -> anyhow::Result<Option<ReconConfig>> {
    let config_path = ctx.config_path();
    if config_path.exists() {
        Ok(Some(ReconConfig::from_file(config_path)?))
    } else {
        Ok(None)
    }
}

fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let config = match load_file_config(ctx)? {
        Some(config) => config,
        None => {
            println!(
                "{} No config file found, showing defaults.",
                style("ℹ").blue()
            );
            ReconConfig::default()
        }
    };

    // Mask secrets
    let mut json = serde_json::to_value(&config)?;
    if let Some(provider) = json.get_mut("provider").and_then(|p| p.as_object_mut()) {
        for secret in ["password", "partner_token"] {
            if provider.get(secret).is_some_and(|v| !v.is_null()) {
                provider.insert(secret.to_string(), serde_json::Value::String("********".to_string()));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}

fn init_config(args: InitArgs, ctx: &Context) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| ctx.config_path().to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config = ReconConfig::default();
    config.save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(key: &str, ctx: &Context) -> anyhow::Result<()> {
    let config = load_file_config(ctx)?.unwrap_or_default();
    let json = serde_json::to_value(&config)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);

    Ok(())
}

fn set_config(key: &str, value: &str, ctx: &Context) -> anyhow::Result<()> {
    let config_path = ctx.config_path();

    let config = match load_file_config(ctx)? {
        Some(config) => config,
        None => {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            ReconConfig::default()
        }
    };

    // Try to parse value as JSON, fall back to string
    let parsed_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;

    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, path)) = parts.split_last() else {
        anyhow::bail!("Empty configuration key");
    };

    // Navigate and set the key
    let mut current = &mut json;
    for part in path {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    match current.as_object_mut() {
        Some(obj) if obj.contains_key(*last) => {
            obj.insert((*last).to_string(), parsed_value.clone());
        }
        Some(_) => anyhow::bail!("Configuration key not found: {}", key),
        None => anyhow::bail!("Cannot set value at non-object path"),
    }

    // Convert back and save
    let config: ReconConfig = serde_json::from_value(json)?;
    config.save(config_path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path(ctx: &Context) -> anyhow::Result<()> {
    let config_path = ctx.config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'recon config init' to create a configuration file.");
    }

    Ok(())
}
