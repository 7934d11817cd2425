//! SQ serviceability-check HTTP client

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::SqStatus;

const DEFAULT_BASE_URL: &str = "https://sq.vinenetworks.com.au/api/search";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    #[serde(rename = "placeId")]
    place_id: &'a str,
    autocomplete_search: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: Option<String>,
}

/// Client for the SQ address serviceability-check API
///
/// `verify` never returns an error: the result is shown directly to the end
/// user, so every transport or decode fault is coerced to [`SqStatus::Error`]
/// and logged. This is the opposite policy from the signup pipeline, which
/// halts and alerts an operator.
pub struct SqClient {
    http: reqwest::Client,
    url: String,
}

impl SqClient {
    /// Create a new client against the default SQ endpoint
    pub fn new() -> Self {
        Self::with_url(DEFAULT_BASE_URL)
    }

    /// Create a new client with a custom search endpoint
    pub fn with_url(url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            url: url.to_string(),
        }
    }

    /// Check whether the selected place is serviceable
    pub async fn verify(&self, place_id: &str, address: &str) -> SqStatus {
        let request = SearchRequest {
            place_id,
            autocomplete_search: address,
        };

        let response = match self.http.post(&self.url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(place_id, error = %e, "SQ request failed");
                return SqStatus::Error;
            }
        };

        if !response.status().is_success() {
            warn!(place_id, status = %response.status(), "SQ returned error status");
            return SqStatus::Error;
        }

        let body: SearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(place_id, error = %e, "Failed to parse SQ response");
                return SqStatus::Error;
            }
        };

        let result = match body.status.as_deref() {
            Some(status) => SqStatus::from_status(status),
            None => SqStatus::Error,
        };

        debug!(place_id, result = %result, "SQ lookup complete");
        result
    }
}

impl Default for SqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_wire_shape() {
        let request = SearchRequest {
            place_id: "ChIJ90260rVG1moRkM2MIXVWBAQ",
            autocomplete_search: "1 Main St, Melbourne VIC",
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["placeId"], "ChIJ90260rVG1moRkM2MIXVWBAQ");
        assert_eq!(value["autocomplete_search"], "1 Main St, Melbourne VIC");
    }

    #[test]
    fn test_search_response_tolerates_missing_status() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.status.is_none());

        let body: SearchResponse =
            serde_json::from_str(r#"{"status": "OnNetwork", "extra": 1}"#).unwrap();
        assert_eq!(body.status.as_deref(), Some("OnNetwork"));
    }
}
