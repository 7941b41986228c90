//! Country detection from device coordinates.

use avatar_studio_core::Coordinates;

use crate::error::Result;
use crate::geo::ReverseGeocoder;
use crate::session::{DetectedLocation, SessionStore};

/// Stores the device position and, when the geocoder knows it, the country.
pub struct LocationFlow<'a, S, G> {
    store: &'a S,
    geocoder: &'a G,
}

impl<'a, S, G> LocationFlow<'a, S, G>
where
    S: SessionStore,
    G: ReverseGeocoder,
{
    #[must_use]
    pub const fn new(store: &'a S, geocoder: &'a G) -> Self {
        Self { store, geocoder }
    }

    /// Look up `coordinates` and store the result.
    ///
    /// Geocoding failures are logged and leave the country empty.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Session` only if the result cannot be stored.
    pub async fn detect(&self, coordinates: Coordinates) -> Result<DetectedLocation> {
        let country = match self.geocoder.country_at(coordinates).await {
            Ok(country) => country,
            Err(e) => {
                tracing::warn!(error = %e, "Reverse geocoding failed");
                None
            }
        };

        let location = DetectedLocation {
            country,
            coordinates: Some(coordinates),
        };
        self.store.update_location(&location)?;
        Ok(location)
    }
}
