//! Contact relay web server.
//!
//! Serves the contact routes:
//! - Answers CORS preflight and rejects other methods
//! - Verifies the Turnstile token
//! - Forwards the allow-listed fields to the configured provider

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contact_relay::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("contact_relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        allowed_origin = %config.allowed_origin,
        request_timeout_ms = config.request_timeout_ms,
        require_token = config.require_token,
        benign_failure_codes = ?config.benign_failure_codes,
        allowed_fields = ?config.allowed_fields,
        send_email_backend = %config.send_email_backend,
        turnstile_backend = %config.turnstile_backend,
        turnstile_secret_configured = config.turnstile_secret_key.is_some(),
        resend_key_configured = config.resend_api_key.is_some(),
        contact_email_configured = config.contact_email.is_some(),
        form_relay_key_configured = config.form_relay_access_key.is_some(),
        form_relay_html_fallback = config.form_relay_html_fallback,
        "config_loaded"
    );

    if config.turnstile_secret_key.is_none() {
        warn!("turnstile_secret_not_configured");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Create application state
    let state = AppState::new(&config)?;

    // Build the router
    let app = router(state);

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "contact_relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("contact_relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("contact_relay_shutting_down");
}
