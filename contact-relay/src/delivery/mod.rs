//! Delivery of sanitized submissions to an external provider.
//!
//! ## Backends
//!
//! ```text
//! Submission → DeliveryRelay::deliver() → email (Resend)      → DeliveryOutcome
//!                                       → form relay (Web3Forms)
//! ```

pub mod email;
pub mod form_relay;

use reqwest::Client;
use tracing::{error, info};

use crate::config::{BackendKind, Config};
use crate::error::RelayError;
use crate::submission::Submission;

pub use email::{deliver_email, EmailSettings};
pub use form_relay::{
    build_payload, deliver_form_relay, interpret_relay_response, is_success_page,
    FormRelaySettings, SUCCESS_PAGE_MARKER,
};

/// Message returned to the caller when delivery succeeds.
pub const SUCCESS_MESSAGE: &str = "Message sent successfully!";

/// Message returned to the caller when the provider refuses the submission.
pub const REJECTED_MESSAGE: &str = "Failed to send message";

/// Longest provider detail surfaced to the caller.
pub const DETAIL_LIMIT: usize = 200;

/// What the delivery provider made of the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub ok: bool,
    pub message: String,
    pub error_detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent() -> Self {
        Self {
            ok: true,
            message: SUCCESS_MESSAGE.to_string(),
            error_detail: None,
        }
    }

    /// A refusal; `detail` is cut to [`DETAIL_LIMIT`] characters.
    pub fn rejected(detail: &str) -> Self {
        Self {
            ok: false,
            message: REJECTED_MESSAGE.to_string(),
            error_detail: Some(truncate(detail, DETAIL_LIMIT)),
        }
    }
}

/// Provider selection plus its settings.
#[derive(Debug, Clone)]
pub enum DeliveryBackend {
    Email(EmailSettings),
    FormRelay(FormRelaySettings),
}

impl DeliveryBackend {
    /// Build the backend of the given kind from configuration.
    pub fn from_config(kind: BackendKind, config: &Config) -> Self {
        match kind {
            BackendKind::Email => DeliveryBackend::Email(EmailSettings::from_config(config)),
            BackendKind::FormRelay => {
                DeliveryBackend::FormRelay(FormRelaySettings::from_config(config))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            DeliveryBackend::Email(_) => BackendKind::Email,
            DeliveryBackend::FormRelay(_) => BackendKind::FormRelay,
        }
    }
}

/// Sends sanitized submissions to one backend.
#[derive(Debug, Clone)]
pub struct DeliveryRelay {
    client: Client,
    backend: DeliveryBackend,
}

impl DeliveryRelay {
    pub fn new(client: Client, backend: DeliveryBackend) -> Self {
        Self { client, backend }
    }

    /// Forward `fields` to the configured backend.
    ///
    /// A provider refusal comes back as an outcome with `ok == false`;
    /// only transport-level trouble is an error.
    pub async fn deliver(&self, fields: &Submission) -> Result<DeliveryOutcome, RelayError> {
        info!(provider = %self.backend.kind(), "delivery_routing");

        let result = match &self.backend {
            DeliveryBackend::Email(settings) => deliver_email(&self.client, settings, fields).await,
            DeliveryBackend::FormRelay(settings) => {
                deliver_form_relay(&self.client, settings, fields).await
            }
        };

        match result {
            Ok(outcome) => {
                info!(
                    provider = %self.backend.kind(),
                    ok = outcome.ok,
                    error_detail = ?outcome.error_detail,
                    "delivery_complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    provider = %self.backend.kind(),
                    error = %format!("{e:#}"),
                    "delivery_unavailable"
                );
                Err(RelayError::DeliveryUnavailable(e))
            }
        }
    }
}

/// First `max` characters of `text`.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
