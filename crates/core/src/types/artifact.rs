//! Generated avatar artifacts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Base64-encoded image payload as returned by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    #[must_use]
    pub const fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// The encoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the payload into raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid standard base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.0.trim())
    }

    /// A `data:` URI that displays the image inline.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.0)
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncodedImage({} bytes)", self.0.len())
    }
}

impl From<String> for EncodedImage {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

/// One previously generated avatar plus its metadata.
///
/// Server-owned and read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub user_id: String,
    /// Country snapshot taken when the avatar was generated.
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(alias = "image_base64", default)]
    pub image: EncodedImage,
    /// Generation time; absent when the backend did not record a readable one.
    #[serde(default, deserialize_with = "deserialize_utc")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accept RFC 3339 timestamps and naive ISO-8601 ones (taken as UTC).
/// Null and unreadable values yield `None`.
fn deserialize_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_utc))
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
