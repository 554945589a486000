//! Request-terminal failures and their HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::delivery::REJECTED_MESSAGE;
use crate::submission::ParseError;
use crate::web::ContactResponse;

/// Error code reported when the form arrives without a Turnstile token.
pub const MISSING_INPUT_RESPONSE: &str = "missing-input-response";

/// Everything that can end a contact request early.
///
/// `VerificationFailed` and `DeliveryRejected` carry provider detail that is
/// safe to return to the caller. The `*Unavailable` variants are reported as
/// a bare 500 and only logged in full.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("failed to parse submission")]
    Parse(#[from] ParseError),

    #[error("turnstile token missing")]
    MissingToken,

    #[error("turnstile verification failed: {codes:?}")]
    VerificationFailed { codes: Vec<String> },

    #[error("turnstile verification unavailable")]
    VerificationUnavailable(#[source] anyhow::Error),

    #[error("delivery rejected: {detail}")]
    DeliveryRejected { detail: String },

    #[error("delivery backend unavailable")]
    DeliveryUnavailable(#[source] anyhow::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingToken
            | RelayError::VerificationFailed { .. }
            | RelayError::DeliveryRejected { .. } => StatusCode::BAD_REQUEST,
            RelayError::Parse(_)
            | RelayError::VerificationUnavailable(_)
            | RelayError::DeliveryUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            RelayError::MethodNotAllowed => {
                return (status, "Method not allowed").into_response();
            }
            RelayError::MissingToken => ContactResponse::failure(
                "Security verification required. Please complete the verification and try again.",
                Some(json!([MISSING_INPUT_RESPONSE])),
            ),
            RelayError::VerificationFailed { codes } => ContactResponse::failure(
                "Security verification failed. Please try again.",
                Some(json!(codes)),
            ),
            RelayError::DeliveryRejected { detail } => {
                ContactResponse::failure(REJECTED_MESSAGE, Some(json!(detail)))
            }
            RelayError::Parse(_)
            | RelayError::VerificationUnavailable(_)
            | RelayError::DeliveryUnavailable(_) => {
                ContactResponse::failure("Internal server error", None)
            }
        };

        if status.is_server_error() {
            // `{:#}` keeps the whole source chain in one line
            error!(error = %format!("{:#}", anyhow::Error::from(self)), "contact_request_error");
        } else {
            warn!(status = status.as_u16(), error = %self, "contact_request_rejected");
        }

        (status, Json(body)).into_response()
    }
}
