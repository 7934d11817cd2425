//! Sonar GraphQL API HTTP client

use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{Result, SonarError};
use crate::types::{CreateAccountInput, IdName, ServiceableAddressInput};

const CREATE_ADDRESS_MUTATION: &str = "mutation createServiceableAddress($input: CreateServiceableAddressMutationInput!) { createServiceableAddress(input: $input) { id } }";
const CREATE_ACCOUNT_MUTATION: &str = "mutation createAccount($input: CreateAccountMutationInput!) { createAccount(input: $input) { id } }";

// The settings panel refetches the id/name lists on every load; they change
// rarely, so a short-lived cache keeps the panel snappy.
const LIST_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Client for the Sonar CRM GraphQL API
///
/// Mutations (`create_address`, `create_account`) are single attempts with no
/// retry: transport and GraphQL-level faults surface as [`SonarError`], while
/// a well-formed response that lacks the selected `id` yields `Ok(None)`.
#[derive(Clone)]
pub struct SonarClient {
    http: reqwest::Client,
    url: String,
    key: String,
    list_cache: Cache<String, Vec<IdName>>,
}

impl SonarClient {
    /// Create a new client with default settings (30 second timeout)
    pub fn new(url: &str, key: &str) -> Self {
        Self::with_timeout(url, key, Duration::from_secs(30))
    }

    /// Create a new client with a custom timeout
    pub fn with_timeout(url: &str, key: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        let list_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(LIST_CACHE_TTL_SECS))
            .build();

        Self {
            http,
            url: url.to_string(),
            key: key.to_string(),
            list_cache,
        }
    }

    /// Create a serviceable address, returning its id when Sonar created one
    pub async fn create_address(&self, input: &ServiceableAddressInput) -> Result<Option<String>> {
        let data = self
            .run(CREATE_ADDRESS_MUTATION, json!({ "input": input }))
            .await?;
        Ok(entity_id(data.pointer("/createServiceableAddress/id")))
    }

    /// Create an account against a previously created serviceable address
    pub async fn create_account(&self, input: &CreateAccountInput) -> Result<Option<String>> {
        let data = self
            .run(CREATE_ACCOUNT_MUTATION, json!({ "input": input }))
            .await?;
        Ok(entity_id(data.pointer("/createAccount/id")))
    }

    /// Companies configured in Sonar, in API order
    pub async fn companies(&self) -> Vec<IdName> {
        self.entities("companies").await
    }

    /// Account statuses configured in Sonar, in API order
    pub async fn account_statuses(&self) -> Vec<IdName> {
        self.entities("account_statuses").await
    }

    /// Account types configured in Sonar, in API order
    pub async fn account_types(&self) -> Vec<IdName> {
        self.entities("account_types").await
    }

    /// List query for a top-level `{ entities { id name } }` collection.
    ///
    /// These feed the settings UI, so they fail open: any fault logs a
    /// warning and yields an empty list rather than an error.
    async fn entities(&self, root: &str) -> Vec<IdName> {
        if let Some(cached) = self.list_cache.get(root).await {
            return cached;
        }

        let query = format!("query {{ {} {{ entities {{ id name }} }} }}", root);
        let data = match self.run(&query, Value::Null).await {
            Ok(data) => data,
            Err(e) => {
                warn!(query = root, error = %e, "Sonar list query failed");
                return Vec::new();
            }
        };

        let entities = parse_entities(&data, root);
        self.list_cache
            .insert(root.to_string(), entities.clone())
            .await;
        entities
    }

    /// Run one GraphQL request and return its `data` payload
    async fn run(&self, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(&self.url)
            .header("Authorization", &self.key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SonarError::Status(response.status()));
        }

        let envelope: GraphqlEnvelope = response.json().await?;
        if let Some(first) = envelope.errors.as_ref().and_then(|errors| errors.first()) {
            return Err(SonarError::Api(first.message.clone()));
        }

        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

/// Extract a selected `id`, which Sonar serializes as either string or number
fn entity_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_entities(data: &Value, root: &str) -> Vec<IdName> {
    data.pointer(&format!("/{}/entities", root))
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
