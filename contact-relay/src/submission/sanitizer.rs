//! Allow-list filtering of submission fields before they leave the relay.

use tracing::{info, warn};

use super::Submission;

/// Substrings that mark a field as verification material.
const BLOCKED_SUBSTRINGS: &[&str] = &["turnstile", "token", "response"];

/// Builds the outbound payload from an allow-list of field names.
#[derive(Debug, Clone)]
pub struct FieldSanitizer {
    allowed: Vec<String>,
}

impl FieldSanitizer {
    /// Create a sanitizer for the given allow-list.
    ///
    /// Names that look like verification fields are dropped here, even when
    /// configured, so a token can never be forwarded.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = allowed
            .into_iter()
            .map(Into::into)
            .filter(|field: &String| {
                let blocked = is_blocked(field);
                if blocked {
                    warn!(field = %field, "sanitizer_blocked_field_in_allow_list");
                }
                !blocked
            })
            .collect();

        Self { allowed }
    }

    pub fn allowed_fields(&self) -> &[String] {
        &self.allowed
    }

    /// Copy allow-listed fields into a fresh submission.
    ///
    /// Every allowed field is present in the output; missing ones are empty.
    pub fn sanitize(&self, submission: &Submission) -> Submission {
        let dropped: Vec<&str> = submission
            .keys()
            .filter(|key| !self.allowed.iter().any(|a| a == *key))
            .collect();

        let clean: Submission = self
            .allowed
            .iter()
            .map(|field| (field.as_str(), submission.get(field).unwrap_or_default()))
            .collect();

        info!(
            forwarded = ?clean.keys().collect::<Vec<_>>(),
            dropped = ?dropped,
            "sanitizer_complete"
        );

        clean
    }
}

impl Default for FieldSanitizer {
    fn default() -> Self {
        Self::new(["name", "email", "message"])
    }
}

fn is_blocked(field: &str) -> bool {
    let lower = field.to_ascii_lowercase();
    BLOCKED_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::TOKEN_FIELD;

    #[test]
    fn test_sanitize_keeps_only_allowed() {
        let submission: Submission = [
            ("name", "Ada"),
            ("email", "ada@example.com"),
            ("message", "Hi"),
            ("website", "spam.example"),
            (TOKEN_FIELD, "tok"),
        ]
        .into_iter()
        .collect();

        let clean = FieldSanitizer::default().sanitize(&submission);

        assert_eq!(clean.keys().collect::<Vec<_>>(), vec!["email", "message", "name"]);
        assert_eq!(clean.get("name"), Some("Ada"));
        assert_eq!(clean.get("website"), None);
        assert_eq!(clean.get(TOKEN_FIELD), None);
    }

    #[test]
    fn test_sanitize_missing_fields_default_to_empty() {
        let submission: Submission = [("email", "ada@example.com")].into_iter().collect();

        let clean = FieldSanitizer::default().sanitize(&submission);

        assert_eq!(clean.get("name"), Some(""));
        assert_eq!(clean.get("message"), Some(""));
        assert_eq!(clean.get("email"), Some("ada@example.com"));
    }

    #[test]
    fn test_allow_list_cannot_admit_token_fields() {
        let sanitizer =
            FieldSanitizer::new(["name", TOKEN_FIELD, "csrf_token", "g-recaptcha-Response"]);
        assert_eq!(sanitizer.allowed_fields(), ["name".to_string()]);

        let submission: Submission =
            [("name", "Ada"), (TOKEN_FIELD, "tok"), ("csrf_token", "x")].into_iter().collect();
        let clean = sanitizer.sanitize(&submission);

        assert_eq!(clean.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_sanitized_keys_are_subset_of_allow_list() {
        let sanitizer = FieldSanitizer::default();
        let noisy = [
            vec![],
            vec![("name", "a")],
            vec![("x", "1"), ("y", "2"), ("message", "m"), (TOKEN_FIELD, "t")],
            vec![("turnstile", "t"), ("email", "e"), ("EMAIL", "E")],
        ];

        for fields in noisy {
            let submission: Submission = fields.into_iter().collect();
            let clean = sanitizer.sanitize(&submission);
            for key in clean.keys() {
                assert!(
                    sanitizer.allowed_fields().iter().any(|a| a == key),
                    "unexpected key {key}"
                );
            }
            assert!(clean.get(TOKEN_FIELD).is_none());
        }
    }
}
