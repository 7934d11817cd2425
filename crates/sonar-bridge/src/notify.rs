//! Operator error notifications
//!
//! Signup-pipeline failures are reported to the operator address configured
//! on the form. The transport is a mail-relay HTTP endpoint owned by the
//! host; [`Notifier`] is the seam so tests can record messages instead of
//! sending them.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

/// Errors from the mail relay
#[derive(Debug)]
pub enum NotifyError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Mail relay HTTP error: {}", e),
            Self::Status(code) => write!(f, "Mail relay returned status {}", code),
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Delivery seam for operator notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts messages as JSON to the host's mail-relay endpoint
pub struct MailRelayClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl MailRelayClient {
    pub fn new(url: &str, token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            url: url.to_string(),
            token,
        }
    }
}

#[async_trait]
impl Notifier for MailRelayClient {
    async fn notify(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mail = OutboundMail { to, subject, body };

        let mut request = self.http.post(&self.url).json(&mail);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }

        Ok(())
    }
}
