//! Conversion between the typed session and the string key space.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use avatar_studio_core::{Coordinates, PasswordDigest, Profile, UserId};

use super::keys;
use super::{DetectedLocation, Identity, SessionSnapshot};

/// The raw persisted key space.
pub type KeySpace = BTreeMap<String, String>;

const LOGGED_IN: &str = "true";

/// Write identity and profile, replacing every identity/profile key.
///
/// Keys for absent optional values are removed so a later load cannot see a
/// mix of old and new fields.
pub(crate) fn write_session(space: &mut KeySpace, identity: &Identity, profile: &Profile) {
    set(space, keys::USER_ID, Some(identity.user_id.as_str().to_owned()));
    set(
        space,
        keys::USER_PASSWORD,
        identity.password.as_ref().map(|d| d.as_str().to_owned()),
    );
    set(
        space,
        keys::COUNTRY_OF_ORIGIN,
        Some(profile.country_of_origin.clone()),
    );
    set(
        space,
        keys::COUNTRY_OF_OCCUPATION,
        Some(profile.country_of_occupation.clone()),
    );
    set(space, keys::AGE, Some(encode_list(profile.age_labels())));
    set(space, keys::GENDER, profile.gender.map(|g| g.as_str().to_owned()));
    set(
        space,
        keys::ETHNICITY,
        profile.ethnicity.map(|e| e.as_str().to_owned()),
    );
    set(space, keys::OCCUPATION, Some(profile.occupation.clone()));
    set(
        space,
        keys::LANGUAGES,
        Some(encode_list(profile.languages.iter().cloned().collect())),
    );
}

pub(crate) fn write_session_flag(space: &mut KeySpace, logged_in: bool) {
    set(space, keys::IS_LOGGED_IN, logged_in.then(|| LOGGED_IN.to_owned()));
}

pub(crate) fn write_location(space: &mut KeySpace, location: &DetectedLocation) {
    set(space, keys::COUNTRY, location.country.clone());
    set(
        space,
        keys::LOCATION,
        location
            .coordinates
            .and_then(|c| serde_json::to_string(&c).ok()),
    );
}

/// Decode a snapshot. Never fails: unreadable values degrade to defaults.
pub(crate) fn read_snapshot(space: &KeySpace) -> SessionSnapshot {
    let identity = space
        .get(keys::USER_ID)
        .and_then(|raw| UserId::parse(raw).ok())
        .map(|user_id| Identity {
            user_id,
            password: space
                .get(keys::USER_PASSWORD)
                .filter(|d| !d.is_empty())
                .map(|d| PasswordDigest::new(d.clone())),
        });

    let profile = Profile {
        country_of_origin: text(space, keys::COUNTRY_OF_ORIGIN),
        country_of_occupation: text(space, keys::COUNTRY_OF_OCCUPATION),
        age_ranges: decode_list(space, keys::AGE)
            .iter()
            .filter_map(|label| parse_label(keys::AGE, label))
            .collect(),
        gender: space
            .get(keys::GENDER)
            .and_then(|label| parse_label(keys::GENDER, label)),
        ethnicity: space
            .get(keys::ETHNICITY)
            .and_then(|label| parse_label(keys::ETHNICITY, label)),
        occupation: text(space, keys::OCCUPATION),
        languages: decode_list(space, keys::LANGUAGES).into_iter().collect(),
    };

    let location = DetectedLocation {
        country: space
            .get(keys::COUNTRY)
            .filter(|c| !c.trim().is_empty())
            .cloned(),
        coordinates: space.get(keys::LOCATION).and_then(|raw| {
            serde_json::from_str::<Coordinates>(raw)
                .inspect_err(|e| tracing::warn!(error = %e, "Ignoring unreadable stored location"))
                .ok()
        }),
    };

    SessionSnapshot {
        identity,
        profile,
        location,
        logged_in: space.get(keys::IS_LOGGED_IN).is_some_and(|v| v == LOGGED_IN),
    }
}

fn set(space: &mut KeySpace, key: &str, value: Option<String>) {
    match value {
        Some(v) => {
            space.insert(key.to_owned(), v);
        }
        None => {
            space.remove(key);
        }
    }
}

fn text(space: &KeySpace, key: &str) -> String {
    space.get(key).cloned().unwrap_or_default()
}

fn encode_list(items: Vec<String>) -> String {
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_owned())
}

/// Decode a list value.
///
/// A JSON array or a single JSON string is taken exactly as stored. A plain
/// comma-separated string (older clients stored lists that way) is split,
/// trimmed and stripped of empty items.
fn decode_list(space: &KeySpace, key: &str) -> BTreeSet<String> {
    let Some(raw) = space.get(key) else {
        return BTreeSet::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Ok(serde_json::Value::String(single)) => BTreeSet::from([single]),
        Ok(serde_json::Value::Null) => BTreeSet::new(),
        _ => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
    }
}

fn parse_label<T>(key: &str, label: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if label.trim().is_empty() {
        return None;
    }
    label
        .parse()
        .inspect_err(|e| tracing::warn!(key, error = %e, "Ignoring unreadable stored value"))
        .ok()
}
