//! Configuration structures for import, refresh and reconciliation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for recon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Receipt provider connection.
    pub provider: ProviderConfig,

    /// Invoice import configuration.
    pub import: ImportConfig,

    /// Matching configuration.
    pub reconcile: ReconcileConfig,

    /// Ledger storage.
    pub ledger: LedgerConfig,
}

/// Receipt provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root, without trailing slash.
    pub base_url: String,

    /// Business the receipts are filed under.
    pub business_id: Option<String>,

    /// Business unit passed with item queries.
    pub business_unit: String,

    /// Partner token sent with every request.
    pub partner_token: Option<String>,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Re-authentication attempts after an expired token.
    pub max_auth_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.luovu.com".to_string(),
            business_id: None,
            business_unit: "1234".to_string(),
            partner_token: None,
            username: None,
            password: None,
            timeout_secs: 60,
            max_auth_retries: 2,
        }
    }
}

/// Invoice import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Domain appended to guessed card holder e-mail addresses.
    pub email_domain: String,

    /// Extra full-name overrides, applied after the built-in ones.
    pub email_overrides: Vec<(String, String)>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            email_domain: "solinor.com".to_string(),
            email_overrides: Vec::new(),
        }
    }
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Days either side of the delivery date searched for receipts.
    pub date_tolerance_days: i64,

    /// Account number marking cash-purchase receipts.
    pub cash_account_number: Option<i64>,

    /// How far back receipt refreshes reach.
    pub refresh_days_back: i64,

    /// How far ahead receipt refreshes reach.
    pub refresh_days_forward: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: 3,
            cash_account_number: Some(1900),
            refresh_days_back: 60,
            refresh_days_forward: 30,
        }
    }
}

/// Ledger storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON file holding rows, receipts and links.
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("recon-ledger.json"),
        }
    }
}

impl ReconConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Override provider credentials from `RECON_*` environment variables.
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let provider = &mut self.provider;
        for (key, slot) in [
            ("RECON_PARTNER_TOKEN", &mut provider.partner_token),
            ("RECON_USERNAME", &mut provider.username),
            ("RECON_PASSWORD", &mut provider.password),
            ("RECON_BUSINESS_ID", &mut provider.business_id),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }
    }
}
