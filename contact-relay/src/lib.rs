//! Contact relay - verify-then-relay handling for contact form submissions.
//!
//! A submission is checked against Cloudflare Turnstile, reduced to an
//! allow-listed set of fields, and forwarded to a delivery provider (an
//! email API or a form-relay API).
//!
//! ## Architecture
//!
//! ```text
//! POST /send-email, /turnstile
//!   → gate → parse → verify token → sanitize → deliver → JSON response
//! ```

pub mod captcha;
pub mod config;
pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod submission;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use captcha::{treat_as_benign_failure, TokenVerifier, VerificationResult};
pub use config::{BackendKind, Config};
pub use delivery::{DeliveryBackend, DeliveryOutcome, DeliveryRelay};
pub use error::RelayError;
pub use pipeline::Pipeline;
pub use submission::{parse_submission, FieldSanitizer, Submission};
pub use web::{router, AppState};
