//! HTTP adapter for the bridge
//!
//! The WordPress side forwards its form hooks here as webhooks, and the
//! settings panel pulls its Sonar option lists from the /api routes. The
//! pipelines themselves know nothing about HTTP or the host's hook system;
//! this router is the whole adapter.

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sonar_api::{IdName, SonarClient};
use sq_client::SqClient;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::entries::EntryApiClient;
use crate::notify::MailRelayClient;
use crate::submission::SubmissionPipeline;
use crate::types::{AjaxSuccessPayload, SubmissionEvent, SubmitResponse};
use crate::verification::VerificationPipeline;

/// Shared state for the HTTP adapter
pub struct AppState {
    pub submission: SubmissionPipeline<SonarClient, MailRelayClient>,
    pub verification: VerificationPipeline<SqClient, EntryApiClient>,
    pub sonar: SonarClient,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: i64,
}

#[derive(Serialize)]
struct AckResponse {
    status: &'static str,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hooks/submission-complete", post(submission_complete))
        .route("/hooks/submit-success", post(submit_success))
        .route("/api/companies", get(companies))
        .route("/api/account-statuses", get(account_statuses))
        .route("/api/account-types", get(account_types))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Completed-submission hook.
///
/// Always acks: pipeline failures are operator-visible (email + log) and
/// never travel back to the host.
async fn submission_complete(
    State(state): State<SharedState>,
    Json(event): Json<SubmissionEvent>,
) -> Json<AckResponse> {
    state.submission.handle(&event).await;
    Json(AckResponse { status: "ok" })
}

/// Ajax success filter: returns the (possibly rewritten) response object
async fn submit_success(
    State(state): State<SharedState>,
    Json(payload): Json<AjaxSuccessPayload>,
) -> Json<SubmitResponse> {
    Json(state.verification.transform(payload).await)
}

async fn companies(State(state): State<SharedState>) -> Json<Vec<IdName>> {
    Json(state.sonar.companies().await)
}

async fn account_statuses(State(state): State<SharedState>) -> Json<Vec<IdName>> {
    Json(state.sonar.account_statuses().await)
}

async fn account_types(State(state): State<SharedState>) -> Json<Vec<IdName>> {
    Json(state.sonar.account_types().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    // Clients point at a discard port; the exercised paths never reach the
    // network.
    fn test_state() -> SharedState {
        let sonar = SonarClient::new("http://127.0.0.1:9/api/graphql", "test-key");
        let sq = SqClient::with_url("http://127.0.0.1:9/api/search");
        let mailer = MailRelayClient::new("http://127.0.0.1:9/mail", None);
        let entries = EntryApiClient::new("http://127.0.0.1:9", None);

        Arc::new(AppState {
            submission: SubmissionPipeline::new(sonar.clone(), mailer),
            verification: VerificationPipeline::new(sq, entries),
            sonar,
            started_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(test_state());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert!(json["uptime"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_submission_hook_acks_disabled_forms() {
        let router = create_router(test_state());

        let payload = serde_json::json!({
            "fields": {},
            "entry_id": 1,
            "form_data": {"settings": {"sonar_enable": "0"}}
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hooks/submission-complete")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_success_passes_non_sq_forms_through() {
        let router = create_router(test_state());

        let payload = serde_json::json!({
            "response": {"confirmation": "Thanks!", "confirmation_type": "message"},
            "form_id": 3,
            "form_data": {"settings": {"form_title": "Contact Us"}}
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hooks/submit-success")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["confirmation"], "Thanks!");
        assert_eq!(json["confirmation_type"], "message");
    }
}
