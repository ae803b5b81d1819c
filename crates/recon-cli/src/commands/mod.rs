//! Subcommands and the state they share.

pub mod config;
pub mod confirm;
pub mod import;
pub mod issues;
pub mod link;
pub mod receipt;
pub mod refresh;
pub mod review;
pub mod users;

use std::path::{Path, PathBuf};

use tracing::debug;

use recon_core::{Ledger, ReconConfig};

/// Paths given on the command line.
pub struct Context {
    config_path: PathBuf,
    ledger_override: Option<PathBuf>,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, ledger_override: Option<PathBuf>) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(default_config_path),
            ledger_override,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Config file contents, defaults if there is none, with environment overrides.
    pub fn load_config(&self) -> anyhow::Result<ReconConfig> {
        let config = if self.config_path.exists() {
            ReconConfig::from_file(&self.config_path)?
        } else {
            debug!("No config at {}, using defaults", self.config_path.display());
            ReconConfig::default()
        };
        Ok(config.apply_env())
    }

    pub fn ledger_path(&self, config: &ReconConfig) -> PathBuf {
        self.ledger_override
            .clone()
            .unwrap_or_else(|| config.ledger.path.clone())
    }

    pub fn open_ledger(&self, config: &ReconConfig) -> anyhow::Result<(Ledger, PathBuf)> {
        let path = self.ledger_path(config);
        let ledger = Ledger::open(&path)?;
        Ok((ledger, path))
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recon")
        .join("config.json")
}
