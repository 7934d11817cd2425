//! Sonar Form Bridge
//!
//! Webhook service that accepts WPForms hooks from a WordPress host, creates
//! serviceable addresses and accounts in the Sonar CRM, and runs the SQ
//! serviceability-check flow against submitted places.

mod config;
mod entries;
mod error;
mod extract;
mod notify;
mod server;
mod submission;
mod types;
mod verification;

use std::sync::Arc;

use chrono::Utc;
use sonar_api::SonarClient;
use sq_client::SqClient;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::BridgeConfig;
use crate::entries::EntryApiClient;
use crate::error::Result;
use crate::notify::MailRelayClient;
use crate::server::{start_server, AppState, SharedState};
use crate::submission::SubmissionPipeline;
use crate::verification::VerificationPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("sonar_bridge=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Sonar Form Bridge...");

    let config = BridgeConfig::load()?;
    info!("Sonar API: {}", config.sonar_url);
    info!("Port: {}", config.port);

    let sonar = SonarClient::new(&config.sonar_url, &config.sonar_api_key);
    let sq = match config.sq_url.as_deref() {
        Some(url) => SqClient::with_url(url),
        None => SqClient::new(),
    };
    let mailer = MailRelayClient::new(&config.mail_relay_url, config.mail_relay_token.clone());
    let entries = EntryApiClient::new(&config.entry_api_url, config.entry_api_token.clone());

    let state: SharedState = Arc::new(AppState {
        submission: SubmissionPipeline::new(sonar.clone(), mailer),
        verification: VerificationPipeline::new(sq, entries),
        sonar,
        started_at: Utc::now(),
    });

    start_server(state, config.port).await?;

    Ok(())
}
