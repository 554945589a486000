//! Request body decoding for contact submissions.
//!
//! Browsers post the contact form either as `multipart/form-data` (a
//! `FormData` body) or as `application/x-www-form-urlencoded`. Multipart
//! bodies are MIME documents, so they go through mailparse once the
//! request's Content-Type is put back in front of the body.

use mailparse::{parse_mail, DispositionType, MailParseError, ParsedMail};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Submission;

const MULTIPART_FORM: &str = "multipart/form-data";
const URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// A body that cannot be decoded into a submission.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),

    #[error("multipart body has no boundary parameter")]
    MissingBoundary,

    #[error("malformed multipart body")]
    Multipart(#[from] MailParseError),
}

/// Decode a request body into a [`Submission`].
///
/// A missing Content-Type is treated as url-encoded, which is how the form
/// posts from older clients arrive.
pub fn parse_submission(content_type: Option<&str>, body: &[u8]) -> Result<Submission, ParseError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    info!(
        content_type = ?essence,
        body_length = body.len(),
        "submission_parse_start"
    );

    let submission = match essence.as_deref() {
        Some(MULTIPART_FORM) => parse_multipart(content_type.unwrap_or_default(), body)?,
        Some(URL_ENCODED) | Some("") | None => parse_url_encoded(body),
        Some(other) => {
            warn!(content_type = %other, "submission_unsupported_content_type");
            return Err(ParseError::UnsupportedContentType(other.to_string()));
        }
    };

    info!(
        field_count = submission.len(),
        fields = ?submission.keys().collect::<Vec<_>>(),
        "submission_parse_complete"
    );

    Ok(submission)
}

fn parse_url_encoded(body: &[u8]) -> Submission {
    url::form_urlencoded::parse(body).collect()
}

fn parse_multipart(content_type: &str, body: &[u8]) -> Result<Submission, ParseError> {
    // Re-attach the Content-Type header so the body parses as a MIME entity
    let mut raw = format!("Content-Type: {content_type}\r\n\r\n").into_bytes();
    raw.extend_from_slice(body);

    let mail = parse_mail(&raw)?;
    if !mail.ctype.params.contains_key("boundary") {
        return Err(ParseError::MissingBoundary);
    }

    let mut submission = Submission::new();
    for part in &mail.subparts {
        if let Some((name, value)) = form_field(part)? {
            submission.insert(name, value);
        }
    }

    Ok(submission)
}

/// Extract a named text field from one multipart section.
///
/// File uploads and sections without a `name` are skipped. mailparse splits
/// disposition parameters on `;` before unquoting, so a quoted name holding a
/// `;` comes back truncated (`name="my;field"` gives `"my`). Such keys never
/// match the allow-list and are dropped by the sanitizer.
fn form_field(part: &ParsedMail) -> Result<Option<(String, String)>, ParseError> {
    let disposition = part.get_content_disposition();
    if disposition.disposition != DispositionType::FormData {
        debug!(disposition = ?disposition.disposition, "multipart_section_skipped");
        return Ok(None);
    }

    let Some(name) = disposition.params.get("name") else {
        debug!("multipart_section_without_name");
        return Ok(None);
    };

    if disposition.params.contains_key("filename") {
        debug!(field = %name, "multipart_file_skipped");
        return Ok(None);
    }

    let raw = part.get_body_raw()?;
    let text = String::from_utf8_lossy(&raw);

    // The line break before the next boundary belongs to the delimiter
    let value = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(&*text);

    Ok(Some((name.clone(), value.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::TOKEN_FIELD;

    fn multipart_body(boundary: &str, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        body.into_bytes()
    }

    #[test]
    fn test_parse_url_encoded() {
        let body = b"name=Ada+Lovelace&email=ada%40example.com&message=Hello%2C%20world&cf-turnstile-response=tok";
        let submission = parse_submission(Some("application/x-www-form-urlencoded"), body).unwrap();

        assert_eq!(submission.get("name"), Some("Ada Lovelace"));
        assert_eq!(submission.get("email"), Some("ada@example.com"));
        assert_eq!(submission.get("message"), Some("Hello, world"));
        assert_eq!(submission.get(TOKEN_FIELD), Some("tok"));
    }

    #[test]
    fn test_parse_url_encoded_with_charset() {
        let submission = parse_submission(
            Some("application/x-www-form-urlencoded; charset=UTF-8"),
            b"name=Ada",
        )
        .unwrap();
        assert_eq!(submission.get("name"), Some("Ada"));
    }

    #[test]
    fn test_parse_missing_content_type_is_url_encoded() {
        let submission = parse_submission(None, b"email=a%40b.c").unwrap();
        assert_eq!(submission.get("email"), Some("a@b.c"));
    }

    #[test]
    fn test_parse_multipart() {
        let boundary = "----WebKitFormBoundary7MA4YWxkTrZu0gW";
        let body = multipart_body(
            boundary,
            &[
                ("name", "Grace Hopper"),
                ("email", "grace@example.com"),
                ("message", "Line one\r\nLine two"),
                (TOKEN_FIELD, "tok-x"),
            ],
        );
        let content_type = format!("multipart/form-data; boundary={boundary}");

        let submission = parse_submission(Some(&content_type), &body).unwrap();

        assert_eq!(submission.get("name"), Some("Grace Hopper"));
        assert_eq!(submission.get("email"), Some("grace@example.com"));
        assert_eq!(submission.get("message"), Some("Line one\r\nLine two"));
        assert_eq!(submission.get(TOKEN_FIELD), Some("tok-x"));
        assert_eq!(submission.len(), 4);
    }

    #[test]
    fn test_parse_multipart_utf8_value() {
        let boundary = "xyz";
        let body = multipart_body(boundary, &[("name", "Zoë Ångström")]);
        let submission =
            parse_submission(Some("multipart/form-data; boundary=\"xyz\""), &body).unwrap();
        assert_eq!(submission.get("name"), Some("Zoë Ångström"));
    }

    #[test]
    fn test_parse_multipart_skips_files() {
        let body = b"--b\r\n\
Content-Disposition: form-data; name=\"attachment\"; filename=\"cv.pdf\"\r\n\
Content-Type: application/pdf\r\n\r\n\
%PDF-1.4\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"name\"\r\n\r\n\
Ada\r\n\
--b--\r\n";

        let submission = parse_submission(Some("multipart/form-data; boundary=b"), body).unwrap();

        assert_eq!(submission.get("attachment"), None);
        assert_eq!(submission.get("name"), Some("Ada"));
    }

    #[test]
    fn test_parse_multipart_semicolon_in_name_is_not_relayed() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"my;field\"\r\n\r\nx\r\n\
--b\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\nada@example.com\r\n--b--\r\n";
        let submission = parse_submission(Some("multipart/form-data; boundary=b"), body).unwrap();

        assert_eq!(submission.get("email"), Some("ada@example.com"));
        assert_eq!(submission.get("my;field"), None);

        let relayed = crate::submission::FieldSanitizer::default().sanitize(&submission);
        let keys: Vec<&str> = relayed.keys().collect();
        assert_eq!(keys, vec!["email", "message", "name"]);
    }

    #[test]
    fn test_parse_multipart_without_boundary() {
        let result = parse_submission(Some("multipart/form-data"), b"name=Ada");
        assert!(matches!(result, Err(ParseError::MissingBoundary)));
    }

    #[test]
    fn test_parse_unsupported_content_type() {
        let result = parse_submission(Some("application/json"), br#"{"name":"Ada"}"#);
        assert!(matches!(
            result,
            Err(ParseError::UnsupportedContentType(ct)) if ct == "application/json"
        ));
    }
}
