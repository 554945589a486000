//! Method gate and CORS preflight for the contact routes.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::RelayError;

/// Methods advertised in preflight responses.
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Request headers advertised in preflight responses.
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// How long browsers may cache a preflight, in seconds.
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// What to do with a request once its method is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// CORS preflight: answer with static headers, never touch the body.
    Preflight,
    /// A submission to run through the pipeline.
    Submit,
}

/// Classify a request by method. Anything but POST and OPTIONS is refused.
pub fn gate(method: &Method) -> Result<GateDecision, RelayError> {
    if method == Method::OPTIONS {
        Ok(GateDecision::Preflight)
    } else if method == Method::POST {
        Ok(GateDecision::Submit)
    } else {
        Err(RelayError::MethodNotAllowed)
    }
}

/// Empty 200 carrying the CORS preflight headers.
pub fn preflight_response(allowed_origin: &HeaderValue) -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin.clone()),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            ),
            (
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE),
            ),
        ],
    )
        .into_response()
}
