//! Process configuration from environment variables
//!
//! Per-form settings travel on each webhook payload; this covers only the
//! process-level endpoints and credentials.

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub port: u16,
    pub sonar_url: String,
    pub sonar_api_key: String,
    /// SQ search endpoint; the client's default is used when unset
    pub sq_url: Option<String>,
    pub mail_relay_url: String,
    pub mail_relay_token: Option<String>,
    pub entry_api_url: String,
    pub entry_api_token: Option<String>,
}

impl BridgeConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080),
            sonar_url: require("SONAR_API_URL")?,
            sonar_api_key: require("SONAR_API_KEY")?,
            sq_url: std::env::var("SQ_API_URL").ok(),
            mail_relay_url: require("MAIL_RELAY_URL")?,
            mail_relay_token: std::env::var("MAIL_RELAY_TOKEN").ok(),
            entry_api_url: require("ENTRY_API_URL")?,
            entry_api_token: std::env::var("ENTRY_API_TOKEN").ok(),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| BridgeError::Config(format!("{} environment variable is required", name)))
}
