//! HTTP client for the receipt provider API.

use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use recon_core::error::ProviderError;
use recon_core::models::config::ProviderConfig;
use recon_core::{RawReceipt, ReceiptProvider};

const PARTNER_TOKEN_HEADER: &str = "X-Luovu-Authentication-Partner-Token";
const ACCESS_TOKEN_HEADER: &str = "X-Luovu-Authentication-Access-Token";

/// Response code of a successful authentication.
const AUTHENTICATED: i64 = 101;

/// Message the API answers with once an access token has expired.
const INVALID_AUTH_KEY: &str = "Invalid authKey.";

#[derive(Deserialize)]
struct AuthResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<AuthData>,
}

#[derive(Deserialize)]
struct AuthData {
    access_token: String,
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

fn is_expired(value: &Value) -> bool {
    value.get("msg").and_then(Value::as_str) == Some(INVALID_AUTH_KEY)
}

/// Receipt provider reached over HTTP.
pub struct HttpReceiptProvider {
    client: reqwest::Client,
    base_url: String,
    business_id: String,
    business_unit: String,
    partner_token: String,
    username: String,
    password: String,
    access_token: Mutex<Option<String>>,
}

impl HttpReceiptProvider {
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let required = |value: &Option<String>, name: &str, var: &str| {
            value.clone().ok_or_else(|| {
                anyhow::anyhow!("Missing provider.{} (set it with 'recon config set' or {})", name, var)
            })
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            business_id: required(&config.business_id, "business_id", "RECON_BUSINESS_ID")?,
            business_unit: config.business_unit.clone(),
            partner_token: required(&config.partner_token, "partner_token", "RECON_PARTNER_TOKEN")?,
            username: required(&config.username, "username", "RECON_USERNAME")?,
            password: required(&config.password, "password", "RECON_PASSWORD")?,
            access_token: Mutex::new(None),
        })
    }

    fn token(&self) -> Option<String> {
        self.access_token.lock().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: String) {
        if let Ok(mut slot) = self.access_token.lock() {
            *slot = Some(token);
        }
    }

    /// Log in and store a fresh access token.
    pub async fn authenticate(&self) -> Result<(), ProviderError> {
        let response: AuthResponse = self
            .client
            .post(format!("{}/api/authenticate", self.base_url))
            .header(PARTNER_TOKEN_HEADER, &self.partner_token)
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(|e| ProviderError::Schema(e.to_string()))?;

        match response {
            AuthResponse {
                code: AUTHENTICATED,
                data: Some(data),
                ..
            } => {
                info!("Authenticated to receipt provider as {}", self.username);
                self.set_token(data.access_token);
                Ok(())
            }
            AuthResponse { code, msg, .. } => Err(ProviderError::Authentication(
                msg.unwrap_or_else(|| format!("response code {}", code)),
            )),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.token() {
            return Ok(token);
        }
        // First request logs in lazily
        self.authenticate().await?;
        self.token()
            .ok_or_else(|| ProviderError::Authentication("no access token".to_string()))
    }

    /// GET a JSON document; `None` for 404.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Value>, ProviderError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(PARTNER_TOKEN_HEADER, &self.partner_token)
            .header(ACCESS_TOKEN_HEADER, token)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        // An expired token still answers 200 with an error object
        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Schema(e.to_string()))?;

        if is_expired(&value) {
            return Err(ProviderError::AuthExpired);
        }
        Ok(Some(value))
    }
}

impl ReceiptProvider for HttpReceiptProvider {
    async fn fetch_receipts(
        &self,
        user: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawReceipt>, ProviderError> {
        let query = [
            ("username", user.to_string()),
            ("business_id", self.business_id.clone()),
            ("business_unit", self.business_unit.clone()),
            ("startdate", start.format("%Y-%m-%d").to_string()),
            ("enddate", end.format("%Y-%m-%d").to_string()),
        ];

        match self.get("/api/items", &query).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| ProviderError::Schema(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_receipt(&self, id: u64) -> Result<Option<RawReceipt>, ProviderError> {
        match self.get(&format!("/api/item/{}", id), &[]).await? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ProviderError::Schema(e.to_string())),
        }
    }

    async fn reauthenticate(&self) -> Result<(), ProviderError> {
        self.authenticate().await
    }
}
