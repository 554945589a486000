//! Web server module for the contact routes.
//!
//! This module provides:
//! - The method gate and CORS preflight
//! - Contact handlers that run the verify-then-relay pipeline
//! - A health check
//!
//! Every contact route is also mounted under `/.netlify/functions/` so
//! existing form actions keep working.

pub mod gate;
pub mod handlers;

use axum::{
    http::header,
    routing::{any, get},
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub use gate::{gate, preflight_response, GateDecision};
pub use handlers::{health, send_email, turnstile, AppState, ContactResponse, HealthResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let contact = Router::new()
        .route("/send-email", any(send_email))
        .route("/turnstile", any(turnstile))
        .route("/.netlify/functions/send-email", any(send_email))
        .route("/.netlify/functions/turnstile", any(turnstile))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            state.allowed_origin.clone(),
        ));

    Router::new()
        .route("/health", get(health))
        .merge(contact)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
