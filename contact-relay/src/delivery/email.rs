//! Transactional email delivery (Resend-compatible API).
//!
//! The submission is rendered into one HTML notification and posted as JSON
//! with bearer authentication. Replies go straight to the submitter.

use anyhow::{Context, Result};
use askama::Template;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::DeliveryOutcome;
use crate::config::Config;
use crate::submission::{preview, Submission};

/// Settings for the email backend.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: String,
    /// Mailbox receiving the notifications
    pub to: String,
    pub from: String,
}

impl EmailSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.resend_api_url.clone(),
            api_key: config.resend_api_key.clone().unwrap_or_default(),
            to: config.contact_email.clone().unwrap_or_default(),
            from: config.email_from.clone(),
        }
    }
}

/// HTML body of a contact notification. Values are escaped on render.
#[derive(Template)]
#[template(path = "contact_email.html")]
struct ContactEmail<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
    submitted_at: String,
}

/// JSON body of the send call.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Subject line, e.g. `New Contact: Ada - 2024-05-01`.
fn subject_line(name: &str, now: DateTime<Utc>) -> String {
    format!("New Contact: {} - {}", name, now.format("%Y-%m-%d"))
}

/// Render the notification HTML for `fields`.
fn render_notification(fields: &Submission, now: DateTime<Utc>) -> Result<String> {
    ContactEmail {
        name: fields.get("name").unwrap_or_default(),
        email: fields.get("email").unwrap_or_default(),
        message: fields.get("message").unwrap_or_default(),
        submitted_at: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
    .render()
    .context("Failed to render contact email")
}

/// Send a contact notification through the email API.
pub async fn deliver_email(
    client: &Client,
    settings: &EmailSettings,
    fields: &Submission,
) -> Result<DeliveryOutcome> {
    let now = Utc::now();
    let name = fields.get("name").unwrap_or_default();
    let email = fields.get("email").unwrap_or_default();

    info!(
        name = %name,
        email = %email,
        message_preview = %preview(fields.get("message").unwrap_or_default(), 50),
        "email_delivery_start"
    );

    let request = SendEmailRequest {
        from: &settings.from,
        to: vec![settings.to.as_str()],
        subject: subject_line(name, now),
        html: render_notification(fields, now)?,
        reply_to: Some(email).filter(|e| !e.is_empty()),
    };

    let response = client
        .post(&settings.api_url)
        .bearer_auth(&settings.api_key)
        .json(&request)
        .send()
        .await
        .context("Failed to reach email API")?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("Failed to read email API response")?;

    if !status.is_success() {
        warn!(
            status_code = status.as_u16(),
            body = %preview(&text, 200),
            "email_delivery_rejected"
        );
        return Ok(DeliveryOutcome::rejected(&text));
    }

    let email_id = serde_json::from_str::<SendEmailResponse>(&text)
        .ok()
        .and_then(|r| r.id);

    info!(
        status_code = status.as_u16(),
        email_id = ?email_id,
        "email_delivery_sent"
    );

    Ok(DeliveryOutcome::sent())
}
