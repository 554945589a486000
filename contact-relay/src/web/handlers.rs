//! Contact endpoint handlers.
//!
//! Each contact route is the same pipeline with its own delivery backend:
//! 1. Gate the method (preflight / 405)
//! 2. Parse the body into a submission
//! 3. Verify, sanitize and deliver
//! 4. Answer with the JSON envelope

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::RelayError;
use crate::pipeline::Pipeline;
use crate::submission::parse_submission;
use crate::util::client_ip;
use crate::web::gate::{gate, preflight_response, GateDecision};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub allowed_origin: HeaderValue,
    pub send_email: Arc<Pipeline>,
    pub turnstile: Arc<Pipeline>,
}

impl AppState {
    /// Build the HTTP client and one pipeline per contact route.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
            .context("ALLOWED_ORIGIN is not a valid header value")?;

        let send_email = Pipeline::from_config(&client, config, config.send_email_backend);
        let turnstile = Pipeline::from_config(&client, config, config.turnstile_backend);

        Ok(Self {
            allowed_origin,
            send_email: Arc::new(send_email),
            turnstile: Arc::new(turnstile),
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Contact Routes
// =============================================================================

/// JSON envelope returned by the contact routes.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContactResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ContactResponse {
    pub fn sent(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            details: None,
        }
    }

    pub fn failure(error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            details,
        }
    }
}

/// `/send-email`: delivers through the `SEND_EMAIL_BACKEND` backend.
pub async fn send_email(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_contact(&state, &state.send_email, "send-email", method, &headers, &body).await
}

/// `/turnstile`: delivers through the `TURNSTILE_BACKEND` backend.
pub async fn turnstile(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_contact(&state, &state.turnstile, "turnstile", method, &headers, &body).await
}

async fn handle_contact(
    state: &AppState,
    pipeline: &Pipeline,
    route: &'static str,
    method: Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    info!(
        route = route,
        method = %method,
        body_length = body.len(),
        "contact_request_received"
    );

    match gate(&method) {
        Ok(GateDecision::Preflight) => return preflight_response(&state.allowed_origin),
        Ok(GateDecision::Submit) => {}
        Err(e) => return e.into_response(),
    }

    match submit(pipeline, headers, body).await {
        Ok(message) => {
            info!(route = route, "contact_request_delivered");
            (StatusCode::OK, Json(ContactResponse::sent(message))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn submit(pipeline: &Pipeline, headers: &HeaderMap, body: &[u8]) -> Result<String, RelayError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let submission = parse_submission(content_type, body)?;
    let outcome = pipeline.run(submission, &client_ip(headers)).await?;

    Ok(outcome.message)
}
