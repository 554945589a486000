//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so the relay boots in a local shell; secrets
//! stay `None` until the hosting platform injects them.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Cloudflare Turnstile siteverify endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Resend transactional email endpoint.
pub const DEFAULT_RESEND_URL: &str = "https://api.resend.com/emails";

/// Web3Forms submission endpoint.
pub const DEFAULT_FORM_RELAY_URL: &str = "https://api.web3forms.com/submit";

/// Which delivery provider a route forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Transactional email API (Resend-compatible).
    Email,
    /// Form-relay API (Web3Forms-style access key).
    FormRelay,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" | "resend" => Ok(BackendKind::Email),
            "form-relay" | "form_relay" | "web3forms" => Ok(BackendKind::FormRelay),
            other => Err(format!("unknown delivery backend `{other}`")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Email => f.write_str("email"),
            BackendKind::FormRelay => f.write_str("form-relay"),
        }
    }
}

/// Body encoding for the form-relay backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEncoding {
    UrlEncoded,
    Json,
}

impl FromStr for RelayEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urlencoded" | "form" => Ok(RelayEncoding::UrlEncoded),
            "json" => Ok(RelayEncoding::Json),
            other => Err(format!("unknown relay encoding `{other}`")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Value of `Access-Control-Allow-Origin` on every contact response
    pub allowed_origin: String,

    /// Timeout applied to each outbound call, in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Turnstile verification
    // =========================================================================

    /// Turnstile shared secret
    pub turnstile_secret_key: Option<String>,

    /// Siteverify endpoint
    pub turnstile_verify_url: String,

    /// Reject submissions that carry no token at all
    pub require_token: bool,

    /// Verification error codes known to be false positives
    pub benign_failure_codes: Vec<String>,

    /// Fields forwarded to the delivery backend
    pub allowed_fields: Vec<String>,

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Backend used by `/send-email`
    pub send_email_backend: BackendKind,

    /// Backend used by `/turnstile`
    pub turnstile_backend: BackendKind,

    /// Resend API key (bearer token)
    pub resend_api_key: Option<String>,

    /// Resend send endpoint
    pub resend_api_url: String,

    /// Mailbox that receives contact notifications
    pub contact_email: Option<String>,

    /// `from` header of contact notifications
    pub email_from: String,

    /// Form-relay submit endpoint
    pub form_relay_url: String,

    /// Form-relay access key
    pub form_relay_access_key: Option<String>,

    /// Name of the field that carries the access key
    pub form_relay_access_key_field: String,

    /// Body encoding for the form-relay POST
    pub form_relay_encoding: RelayEncoding,

    /// Subject line added to form-relay submissions
    pub form_relay_subject: Option<String>,

    /// Accept a non-JSON success page from the form-relay provider
    pub form_relay_html_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            allowed_origin: "*".to_string(),
            request_timeout_ms: 8000,
            turnstile_secret_key: None,
            turnstile_verify_url: DEFAULT_VERIFY_URL.to_string(),
            require_token: true,
            benign_failure_codes: vec!["unsupported-os".to_string()],
            allowed_fields: ["name", "email", "message"].map(String::from).to_vec(),
            send_email_backend: BackendKind::Email,
            turnstile_backend: BackendKind::FormRelay,
            resend_api_key: None,
            resend_api_url: DEFAULT_RESEND_URL.to_string(),
            contact_email: None,
            email_from: "Contact Form <delivered@resend.dev>".to_string(),
            form_relay_url: DEFAULT_FORM_RELAY_URL.to_string(),
            form_relay_access_key: None,
            form_relay_access_key_field: "access_key".to_string(),
            form_relay_encoding: RelayEncoding::UrlEncoded,
            form_relay_subject: Some("New contact form submission".to_string()),
            form_relay_html_fallback: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_var("PORT").unwrap_or(defaults.port),

            allowed_origin: env::var("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),

            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),

            turnstile_secret_key: non_empty_var("TURNSTILE_SECRET_KEY"),

            turnstile_verify_url: env::var("TURNSTILE_VERIFY_URL")
                .unwrap_or(defaults.turnstile_verify_url),

            require_token: parse_bool("REQUIRE_TURNSTILE_TOKEN", defaults.require_token),

            benign_failure_codes: parse_csv("BENIGN_FAILURE_CODES")
                .unwrap_or(defaults.benign_failure_codes),

            allowed_fields: parse_csv("ALLOWED_FIELDS")
                .filter(|fields| !fields.is_empty())
                .unwrap_or(defaults.allowed_fields),

            send_email_backend: parse_var("SEND_EMAIL_BACKEND")
                .unwrap_or(defaults.send_email_backend),

            turnstile_backend: parse_var("TURNSTILE_BACKEND")
                .unwrap_or(defaults.turnstile_backend),

            resend_api_key: non_empty_var("RESEND_API_KEY"),

            resend_api_url: env::var("RESEND_API_URL").unwrap_or(defaults.resend_api_url),

            contact_email: non_empty_var("CONTACT_EMAIL"),

            email_from: env::var("EMAIL_FROM").unwrap_or(defaults.email_from),

            form_relay_url: env::var("FORM_RELAY_URL").unwrap_or(defaults.form_relay_url),

            form_relay_access_key: non_empty_var("WEB3FORMS_ACCESS_KEY")
                .or_else(|| non_empty_var("FORM_RELAY_ACCESS_KEY")),

            form_relay_access_key_field: env::var("FORM_RELAY_ACCESS_KEY_FIELD")
                .unwrap_or(defaults.form_relay_access_key_field),

            form_relay_encoding: parse_var("FORM_RELAY_ENCODING")
                .unwrap_or(defaults.form_relay_encoding),

            // Set but empty disables the subject field entirely
            form_relay_subject: match env::var("FORM_RELAY_SUBJECT") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => defaults.form_relay_subject,
            },

            form_relay_html_fallback: parse_bool(
                "FORM_RELAY_HTML_FALLBACK",
                defaults.form_relay_html_fallback,
            ),
        }
    }
}

/// Read and parse a variable, warning when it is set but malformed.
fn parse_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(env_var = name, value = %raw, error = %e, "Invalid value, using default");
            None
        }
    }
}

/// Read a variable, treating an empty or whitespace-only value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean flag like "true", "1", "no".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
