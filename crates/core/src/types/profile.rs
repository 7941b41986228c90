//! Profile fields and their fixed enumerations.
//!
//! Use the `wire_enum!` macro to define enumerations whose serialized form is
//! the human-readable label the backend expects (e.g. `"Black or African"`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Error returned when a label does not match any enumeration variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?} (expected one of: {expected})")]
pub struct ParseEnumError {
    /// Name of the enumeration.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted labels.
    pub expected: String,
}

/// Macro to define a closed enumeration carried on the wire as a label.
///
/// Creates an enum with:
/// - `Serialize`/`Deserialize` using the given labels
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `ALL` listing every variant in declaration order
/// - `as_str()`, `Display` and `FromStr` over the labels
///
/// Parsing is case-insensitive so command-line input like `non-binary`
/// matches `Non-binary`.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire label of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::profile::ParseEnumError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| $crate::types::profile::ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                        expected: Self::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

wire_enum! {
    /// Age bracket offered by the profile form.
    AgeRange, "age range" {
        Teen => "13-18",
        YoungAdult => "19-25",
        Adult => "26-35",
        MiddleAged => "36-50",
        Mature => "51-65",
        Senior => "66-100",
    }
}

wire_enum! {
    /// Gender options offered by the profile form.
    Gender, "gender" {
        Male => "Male",
        Female => "Female",
        NonBinary => "Non-binary",
        PreferNotToSay => "Prefer not to say",
        SelfDescribe => "Self-describe",
    }
}

wire_enum! {
    /// Race/ethnicity options offered by the profile form.
    Ethnicity, "ethnicity" {
        Asian => "Asian",
        BlackOrAfrican => "Black or African",
        HispanicOrLatino => "Hispanic or Latino",
        White => "White",
        Mixed => "Mixed",
        Other => "Other",
    }
}

/// Demographic and contextual fields reused on every generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Country the user comes from.
    pub country_of_origin: String,
    /// Country the user works in.
    pub country_of_occupation: String,
    /// Selected age brackets.
    pub age_ranges: BTreeSet<AgeRange>,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub occupation: String,
    /// Spoken languages, free text.
    pub languages: BTreeSet<String>,
}

impl Profile {
    /// Names of fields the generation endpoint requires but this profile
    /// lacks. Empty when the profile is complete.
    #[must_use]
    pub fn missing_for_generation(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.country_of_origin.trim().is_empty() {
            missing.push("countryOfOrigin");
        }
        if self.country_of_occupation.trim().is_empty() {
            missing.push("countryOfOccupation");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if self.ethnicity.is_none() {
            missing.push("ethnicity");
        }
        if self.occupation.trim().is_empty() {
            missing.push("occupation");
        }
        missing
    }

    /// Age brackets as wire labels.
    #[must_use]
    pub fn age_labels(&self) -> Vec<String> {
        self.age_ranges.iter().map(|a| a.as_str().to_owned()).collect()
    }
}
