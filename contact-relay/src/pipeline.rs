//! The verify-then-relay pipeline.
//!
//! ```text
//! Submission → verify token → sanitize fields → deliver → DeliveryOutcome
//! ```
//!
//! Each step runs only after the previous one succeeded; any rejection ends
//! the request. Nothing is retried.

use reqwest::Client;
use tracing::{info, warn};

use crate::captcha::TokenVerifier;
use crate::config::{BackendKind, Config};
use crate::delivery::{DeliveryBackend, DeliveryOutcome, DeliveryRelay};
use crate::error::RelayError;
use crate::submission::{FieldSanitizer, Submission};

/// One configured instance of the contact pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    verifier: TokenVerifier,
    sanitizer: FieldSanitizer,
    relay: DeliveryRelay,
    require_token: bool,
}

impl Pipeline {
    pub fn new(
        verifier: TokenVerifier,
        sanitizer: FieldSanitizer,
        relay: DeliveryRelay,
        require_token: bool,
    ) -> Self {
        Self {
            verifier,
            sanitizer,
            relay,
            require_token,
        }
    }

    /// Build a pipeline that delivers through `backend`.
    pub fn from_config(client: &Client, config: &Config, backend: BackendKind) -> Self {
        let verifier = TokenVerifier::new(
            client.clone(),
            config.turnstile_verify_url.clone(),
            config.turnstile_secret_key.clone().unwrap_or_default(),
            config.benign_failure_codes.iter().cloned(),
        );
        let sanitizer = FieldSanitizer::new(config.allowed_fields.iter().cloned());
        let relay = DeliveryRelay::new(client.clone(), DeliveryBackend::from_config(backend, config));

        Self::new(verifier, sanitizer, relay, config.require_token)
    }

    /// Run one submission through verification, sanitizing and delivery.
    pub async fn run(
        &self,
        mut submission: Submission,
        client_ip: &str,
    ) -> Result<DeliveryOutcome, RelayError> {
        let token = submission.take_token();

        info!(
            token_present = token.is_some(),
            client_ip = %client_ip,
            "pipeline_start"
        );

        match token {
            Some(token) => {
                let result = self.verifier.verify(&token, client_ip).await?;
                info!(
                    verified = result.ok,
                    error_codes = ?result.error_codes,
                    "pipeline_verified"
                );
            }
            None if self.require_token => {
                warn!("pipeline_token_missing_blocked");
                return Err(RelayError::MissingToken);
            }
            None => {
                warn!("pipeline_token_missing_unverified");
            }
        }

        let fields = self.sanitizer.sanitize(&submission);
        let outcome = self.relay.deliver(&fields).await?;

        if !outcome.ok {
            return Err(RelayError::DeliveryRejected {
                detail: outcome.error_detail.unwrap_or_default(),
            });
        }

        info!(message = %outcome.message, "pipeline_relayed");
        Ok(outcome)
    }
}
