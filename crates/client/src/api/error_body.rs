//! Mapping of backend error bodies to a single readable message.
//!
//! The backend reports failures as `{"detail": ...}` where `detail` is either
//! a plain string or a list of validation errors:
//!
//! ```json
//! {"detail": [{"loc": ["body", "prompt"], "msg": "field required"}]}
//! ```

use serde_json::Value;

/// Number of characters of an unparsable body kept in the fallback message.
const EXCERPT_CHARS: usize = 100;

/// Decoded `detail` of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// `{"detail": "message"}`
    SingleMessage(String),
    /// `{"detail": [{"loc": [...], "msg": "..."}]}`
    FieldErrors(Vec<FieldError>),
}

/// One entry of a validation error list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Location of the offending field, e.g. `["body", "prompt"]`.
    pub path: Vec<String>,
    pub message: String,
}

impl ErrorDetail {
    /// Parse an error body. Returns `None` if the body is not JSON, does not
    /// have the expected shape, or carries an empty `detail`.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            Value::String(message) if !message.trim().is_empty() => {
                Some(Self::SingleMessage(message.clone()))
            }
            Value::Array(items) => items
                .iter()
                .map(FieldError::from_value)
                .collect::<Option<Vec<_>>>()
                .filter(|errors| !errors.is_empty())
                .map(Self::FieldErrors),
            _ => None,
        }
    }

    /// Render as one line: the message itself, or `path - msg` pairs joined
    /// with `"; "`.
    #[must_use]
    pub fn to_message(&self) -> String {
        match self {
            Self::SingleMessage(message) => message.clone(),
            Self::FieldErrors(errors) => errors
                .iter()
                .map(|e| format!("{} - {}", e.path.join("."), e.message))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl FieldError {
    fn from_value(value: &Value) -> Option<Self> {
        let path = value
            .get("loc")?
            .as_array()?
            .iter()
            .map(|segment| match segment {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        let message = value.get("msg")?.as_str()?.to_owned();
        Some(Self { path, message })
    }
}

/// Turn a non-success response into the message shown to the user.
///
/// Falls back to `Server error: <status> - <excerpt>` when the body does not
/// carry a recognizable `detail`.
#[must_use]
pub fn describe_error_body(status: u16, body: &str) -> String {
    ErrorDetail::parse(body).map_or_else(
        || format!("Server error: {status} - {}", excerpt(body)),
        |detail| detail.to_message(),
    )
}

/// First characters of a body, for error messages.
#[must_use]
pub fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message() {
        let body = r#"{"detail": "Avatar generation limit (10) reached for this user."}"#;
        assert_eq!(
            describe_error_body(403, body),
            "Avatar generation limit (10) reached for this user."
        );
    }

    #[test]
    fn test_field_errors() {
        let body = r#"{"detail": [{"loc": ["body", "prompt"], "msg": "field required"}]}"#;
        let message = describe_error_body(422, body);
        assert_eq!(message, "body.prompt - field required");
        assert!(message.contains("prompt"));
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_multiple_field_errors_with_numeric_segments() {
        let body = r#"{"detail": [
            {"loc": ["body", "age", 0], "msg": "str type expected"},
            {"loc": ["query", "userId"], "msg": "field required"}
        ]}"#;
        assert_eq!(
            describe_error_body(422, body),
            "body.age.0 - str type expected; query.userId - field required"
        );
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            ErrorDetail::parse(r#"{"detail": "nope"}"#),
            Some(ErrorDetail::SingleMessage("nope".to_string()))
        );
        assert_eq!(ErrorDetail::parse(r#"{"detail": []}"#), None);
        assert_eq!(ErrorDetail::parse(r#"{"detail": ""}"#), None);
        assert_eq!(ErrorDetail::parse(r#"{"detail": 42}"#), None);
        assert_eq!(ErrorDetail::parse(r#"{"error": "x"}"#), None);
        assert_eq!(ErrorDetail::parse(r#"{"detail": [{"msg": "no loc"}]}"#), None);
    }

    #[test]
    fn test_fallback_to_excerpt() {
        let body = format!("<html>{}</html>", "x".repeat(200));
        let message = describe_error_body(502, &body);
        assert!(message.starts_with("Server error: 502 - <html>"));
        assert_eq!(message.len(), "Server error: 502 - ".len() + 100);
    }

    #[test]
    fn test_empty_detail_falls_back_to_status_line() {
        assert_eq!(
            describe_error_body(422, r#"{"detail": []}"#),
            r#"Server error: 422 - {"detail": []}"#
        );
        assert!(describe_error_body(400, r#"{"detail": " "}"#).starts_with("Server error: 400 - "));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert_eq!(excerpt(&body).chars().count(), 100);
    }
}
