//! Persisted key space.
//!
//! Values are strings. List values are JSON arrays and `location` is a JSON
//! object, so the file stays readable and compatible with the key layout the
//! web client used.

/// Key for the identity key of the session.
pub const USER_ID: &str = "user_id";

/// Key for the password digest. Never holds plaintext.
pub const USER_PASSWORD: &str = "user_password";

/// Key for the explicit logged-in marker (`"true"` or absent).
pub const IS_LOGGED_IN: &str = "isLoggedIn";

/// Key for the detected current country.
pub const COUNTRY: &str = "country";

pub const COUNTRY_OF_ORIGIN: &str = "countryOfOrigin";

pub const COUNTRY_OF_OCCUPATION: &str = "countryOfOccupation";

/// Key for the selected age brackets (JSON array).
pub const AGE: &str = "age";

pub const GENDER: &str = "gender";

pub const ETHNICITY: &str = "ethnicity";

pub const OCCUPATION: &str = "occupation";

/// Key for spoken languages (JSON array).
pub const LANGUAGES: &str = "languages";

/// Key for the last device position (`{"latitude": .., "longitude": ..}`).
pub const LOCATION: &str = "location";

/// Every key written by the session store.
pub const ALL: &[&str] = &[
    USER_ID,
    USER_PASSWORD,
    IS_LOGGED_IN,
    COUNTRY,
    COUNTRY_OF_ORIGIN,
    COUNTRY_OF_OCCUPATION,
    AGE,
    GENDER,
    ETHNICITY,
    OCCUPATION,
    LANGUAGES,
    LOCATION,
];
