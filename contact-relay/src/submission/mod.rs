//! Contact form submissions.
//!
//! ## Flow
//!
//! ```text
//! raw body → parse_submission() → Submission → take_token() → FieldSanitizer → payload
//! ```

pub mod parser;
pub mod sanitizer;

use std::collections::BTreeMap;

pub use parser::{parse_submission, ParseError};
pub use sanitizer::FieldSanitizer;

/// Form field carrying the Turnstile response token.
pub const TOKEN_FIELD: &str = "cf-turnstile-response";

/// Flat mapping of form field name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: BTreeMap<String, String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field. A repeated field keeps its first value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Remove and return the Turnstile token. Empty tokens count as absent.
    pub fn take_token(&mut self) -> Option<String> {
        self.fields
            .remove(TOKEN_FIELD)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Submission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut submission = Submission::new();
        for (name, value) in iter {
            submission.insert(name, value);
        }
        submission
    }
}

/// First `max` characters of a value, for log previews.
pub fn preview(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &value[..end]),
        None => value.to_string(),
    }
}
