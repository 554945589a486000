//! Cloudflare Turnstile token verification.
//!
//! Reference: https://developers.cloudflare.com/turnstile/get-started/server-side-validation/

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::submission::preview;

/// Outcome of one siteverify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub ok: bool,
    pub error_codes: BTreeSet<String>,
}

/// Siteverify response body.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Whether a failed verification should be let through anyway.
///
/// Turnstile reports `unsupported-os` for some real visitors on platforms it
/// cannot challenge. A failure is benign only when it has at least one code
/// and every code is in `benign`; an empty `benign` set disables the bypass.
pub fn treat_as_benign_failure(codes: &BTreeSet<String>, benign: &BTreeSet<String>) -> bool {
    !codes.is_empty() && codes.is_subset(benign)
}

/// Verifies Turnstile tokens against the siteverify endpoint.
#[derive(Clone)]
pub struct TokenVerifier {
    client: Client,
    verify_url: String,
    secret_key: String,
    benign_failure_codes: BTreeSet<String>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("verify_url", &self.verify_url)
            .field("secret_key", &"[redacted]")
            .field("benign_failure_codes", &self.benign_failure_codes)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new<I>(
        client: Client,
        verify_url: impl Into<String>,
        secret_key: impl Into<String>,
        benign_failure_codes: I,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            client,
            verify_url: verify_url.into(),
            secret_key: secret_key.into(),
            benign_failure_codes: benign_failure_codes.into_iter().collect(),
        }
    }

    /// Call siteverify for `token`.
    ///
    /// Transport failures and unreadable replies are errors, never a pass.
    pub async fn siteverify(&self, token: &str, remote_ip: &str) -> anyhow::Result<VerificationResult> {
        info!(
            token_preview = %preview(token, 10),
            remote_ip = %remote_ip,
            "turnstile_verify_start"
        );

        let params = [
            ("secret", self.secret_key.as_str()),
            ("response", token),
            ("remoteip", remote_ip),
        ];

        let response = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .context("Failed to reach siteverify endpoint")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read siteverify response")?;

        let parsed: SiteverifyResponse = serde_json::from_str(&text).with_context(|| {
            format!(
                "Invalid siteverify response (status {}): {}",
                status.as_u16(),
                preview(&text, 200)
            )
        })?;

        let result = VerificationResult {
            ok: parsed.success,
            error_codes: parsed.error_codes.into_iter().collect(),
        };

        info!(
            status_code = status.as_u16(),
            success = result.ok,
            error_codes = ?result.error_codes,
            "turnstile_verify_complete"
        );

        Ok(result)
    }

    /// Verify `token` and apply the benign-failure policy.
    pub async fn verify(&self, token: &str, remote_ip: &str) -> Result<VerificationResult, RelayError> {
        let result = self.siteverify(token, remote_ip).await.map_err(|e| {
            error!(error = %format!("{e:#}"), "turnstile_verify_unavailable");
            RelayError::VerificationUnavailable(e)
        })?;

        if result.ok {
            return Ok(result);
        }

        if treat_as_benign_failure(&result.error_codes, &self.benign_failure_codes) {
            warn!(error_codes = ?result.error_codes, "turnstile_benign_failure_bypassed");
            return Ok(result);
        }

        warn!(error_codes = ?result.error_codes, "turnstile_verify_failed");
        Err(RelayError::VerificationFailed {
            codes: result.error_codes.into_iter().collect(),
        })
    }
}
