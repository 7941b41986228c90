//! Request and response bodies of the backend REST surface.

use avatar_studio_core::{EncodedImage, GeneratedArtifact, Profile, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;

/// Country sent when none was detected.
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Body of `POST /store-user-avatar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRequest {
    pub user_id: String,
    pub country: String,
    pub prompt: String,
    pub age: Vec<String>,
    pub gender: String,
    pub ethnicity: String,
    pub occupation: String,
    #[serde(rename = "countryOfOrigin")]
    pub country_of_origin: String,
    #[serde(rename = "countryOfOccupation")]
    pub country_of_occupation: String,
    pub languages: Vec<String>,
}

impl AvatarRequest {
    /// Snapshot the profile into a generation request.
    #[must_use]
    pub fn new(user_id: &UserId, profile: &Profile, country: Option<&str>, prompt: &str) -> Self {
        Self {
            user_id: user_id.as_str().to_owned(),
            country: country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(UNKNOWN_COUNTRY)
                .to_owned(),
            prompt: prompt.to_owned(),
            age: profile.age_labels(),
            gender: profile.gender.map(|g| g.as_str().to_owned()).unwrap_or_default(),
            ethnicity: profile
                .ethnicity
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            occupation: profile.occupation.clone(),
            country_of_origin: profile.country_of_origin.clone(),
            country_of_occupation: profile.country_of_occupation.clone(),
            languages: profile.languages.iter().cloned().collect(),
        }
    }
}

/// Body of `POST /store-user-details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub user_id: String,
    pub age: Vec<String>,
    pub gender: String,
    pub ethnicity: String,
    pub occupation: String,
    pub languages: Vec<String>,
}

impl UserDetails {
    #[must_use]
    pub fn new(user_id: &UserId, profile: &Profile) -> Self {
        Self {
            user_id: user_id.as_str().to_owned(),
            age: profile.age_labels(),
            gender: profile.gender.map(|g| g.as_str().to_owned()).unwrap_or_default(),
            ethnicity: profile
                .ethnicity
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            occupation: profile.occupation.clone(),
            languages: profile.languages.iter().cloned().collect(),
        }
    }
}

/// Response of `GET /avatar-count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub remaining: u32,
    /// Generations used so far, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Response of `POST /store-user-avatar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(alias = "image_base64")]
    pub image: EncodedImage,
}

/// Decode the `GET /avatars` body: either `{avatars: [...]}` or a bare list.
///
/// Records that cannot be read are skipped with a warning so one bad entry
/// does not hide the rest of the gallery.
pub(crate) fn decode_avatar_list(body: Value) -> Result<Vec<GeneratedArtifact>, ApiError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("avatars") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::MalformedResponse(
                    "expected an `avatars` list in the response".into(),
                ));
            }
        },
        _ => return Err(ApiError::MalformedResponse("expected a list of avatars".into())),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value(item)
                .inspect_err(|e| {
                    tracing::warn!(index, error = %e, "Skipping unreadable avatar record");
                })
                .ok()
        })
        .collect())
}
