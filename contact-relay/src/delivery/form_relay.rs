//! Form-relay delivery (Web3Forms-style access key APIs).
//!
//! The provider gets the sanitized fields plus its access key in a single
//! POST. Most replies are JSON `{success, message}`; some providers answer
//! with an HTML confirmation page instead, which is only accepted when the
//! fallback is switched on.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::DeliveryOutcome;
use crate::config::{Config, RelayEncoding};
use crate::submission::{preview, Submission};

/// Text on the provider's HTML confirmation page.
pub const SUCCESS_PAGE_MARKER: &str = "Form submitted successfully!";

/// Settings for the form-relay backend.
#[derive(Debug, Clone)]
pub struct FormRelaySettings {
    pub url: String,
    pub access_key: String,
    pub access_key_field: String,
    pub subject: Option<String>,
    pub encoding: RelayEncoding,
    pub html_fallback: bool,
}

impl FormRelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.form_relay_url.clone(),
            access_key: config.form_relay_access_key.clone().unwrap_or_default(),
            access_key_field: config.form_relay_access_key_field.clone(),
            subject: config.form_relay_subject.clone(),
            encoding: config.form_relay_encoding,
            html_fallback: config.form_relay_html_fallback,
        }
    }
}

/// JSON reply from the provider.
#[derive(Debug, Deserialize)]
struct RelayReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Outbound field list: access key, optional subject, then the submission.
pub fn build_payload(settings: &FormRelaySettings, fields: &Submission) -> Vec<(String, String)> {
    let mut payload = vec![(settings.access_key_field.clone(), settings.access_key.clone())];

    if let Some(subject) = &settings.subject {
        payload.push(("subject".to_string(), subject.clone()));
    }

    payload.extend(
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
    );

    payload
}

/// Whether a non-JSON reply is the provider's confirmation page.
pub fn is_success_page(body: &str) -> bool {
    body.contains(SUCCESS_PAGE_MARKER)
}

/// Map a provider reply to an outcome.
///
/// A non-JSON reply is an error unless the HTML fallback is on and the
/// confirmation text is present.
pub fn interpret_relay_response(
    status: StatusCode,
    body: &str,
    html_fallback: bool,
) -> Result<DeliveryOutcome> {
    if let Ok(reply) = serde_json::from_str::<RelayReply>(body) {
        if status.is_success() && reply.success {
            return Ok(DeliveryOutcome::sent());
        }
        let detail = reply.message.unwrap_or_else(|| "Unknown error".to_string());
        return Ok(DeliveryOutcome::rejected(&detail));
    }

    if html_fallback && is_success_page(body) {
        info!(status_code = status.as_u16(), "form_relay_success_page_detected");
        return Ok(DeliveryOutcome::sent());
    }

    bail!(
        "Form relay returned a non-JSON response (status {}): {}",
        status.as_u16(),
        preview(body, 200)
    )
}

/// Forward a sanitized submission to the form-relay provider.
pub async fn deliver_form_relay(
    client: &Client,
    settings: &FormRelaySettings,
    fields: &Submission,
) -> Result<DeliveryOutcome> {
    let payload = build_payload(settings, fields);

    info!(
        fields = ?payload
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| *k != settings.access_key_field)
            .collect::<Vec<_>>(),
        access_key_set = !settings.access_key.is_empty(),
        encoding = ?settings.encoding,
        "form_relay_delivery_start"
    );

    let request = client.post(&settings.url);
    let request = match settings.encoding {
        RelayEncoding::UrlEncoded => request.form(&payload),
        RelayEncoding::Json => {
            let body: serde_json::Map<String, serde_json::Value> = payload
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            request.json(&body)
        }
    };

    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .context("Failed to reach form relay")?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("Failed to read form relay response")?;

    let outcome = interpret_relay_response(status, &text, settings.html_fallback)?;
    if !outcome.ok {
        warn!(
            status_code = status.as_u16(),
            error_detail = ?outcome.error_detail,
            "form_relay_delivery_rejected"
        );
    }

    Ok(outcome)
}
