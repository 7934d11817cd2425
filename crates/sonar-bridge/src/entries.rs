//! Stored-entry access
//!
//! Submissions live in the forms host's entry store; the serviceability
//! result is written back onto the stored entry's field map. [`EntryStore`]
//! is the seam; the production impl talks to the host's entry HTTP API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Errors from the entry API
#[derive(Debug)]
pub enum EntryStoreError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl fmt::Display for EntryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Entry API HTTP error: {}", e),
            Self::Status(code) => write!(f, "Entry API returned status {}", code),
        }
    }
}

impl std::error::Error for EntryStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EntryStoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Read/write access to a stored entry's serialized field map.
///
/// The field map is kept as the host stores it: a JSON string keyed by field
/// id. The read-modify-write cycle around it is not guarded against
/// concurrent edits of the same entry; last write wins.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// The entry's serialized field map, if the entry exists
    async fn fields(&self, entry_id: &str) -> Result<Option<String>, EntryStoreError>;

    /// Replace the entry's serialized field map
    async fn update_fields(&self, entry_id: &str, fields: &str) -> Result<(), EntryStoreError>;
}

#[derive(Debug, Deserialize)]
struct EntryRecord {
    #[serde(default)]
    fields: Option<String>,
}

/// Client for the forms host's entry HTTP API
pub struct EntryApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl EntryApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn entry_url(&self, entry_id: &str) -> String {
        format!("{}/entries/{}", self.base_url, entry_id)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl EntryStore for EntryApiClient {
    async fn fields(&self, entry_id: &str) -> Result<Option<String>, EntryStoreError> {
        let request = self.authed(self.http.get(self.entry_url(entry_id)));
        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EntryStoreError::Status(response.status()));
        }

        let record: EntryRecord = response.json().await?;
        Ok(record.fields)
    }

    async fn update_fields(&self, entry_id: &str, fields: &str) -> Result<(), EntryStoreError> {
        let request = self
            .authed(self.http.put(self.entry_url(entry_id)))
            .json(&json!({ "fields": fields }));
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(EntryStoreError::Status(response.status()));
        }

        Ok(())
    }
}
