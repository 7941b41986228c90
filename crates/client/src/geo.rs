//! Best-effort reverse geocoding.
//!
//! Used to pre-fill the current country. Nothing depends on it succeeding:
//! callers treat every failure as "country unknown".

use std::future::Future;
use std::time::Duration;

use avatar_studio_core::Coordinates;
use serde::Deserialize;
use url::Url;

use crate::api::{ApiError, describe_error_body, excerpt};

/// Resolves coordinates to a country name.
pub trait ReverseGeocoder: Send + Sync {
    /// Country at `coordinates`, or `None` if the service has no answer.
    fn country_at(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;
}

/// HTTP reverse geocoder.
///
/// Speaks the `BigDataCloud` client endpoint (`countryName`) and also accepts
/// Nominatim-shaped answers (`address.country`).
#[derive(Debug, Clone)]
pub struct HttpGeocoder {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default, rename = "countryName")]
    country_name: Option<String>,
    #[serde(default)]
    address: Option<GeocodeAddress>,
}

#[derive(Debug, Deserialize)]
struct GeocodeAddress {
    #[serde(default)]
    country: Option<String>,
}

impl GeocodeResponse {
    fn into_country(self) -> Option<String> {
        self.country_name
            .or_else(|| self.address.and_then(|a| a.country))
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
    }
}

impl HttpGeocoder {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("avatar-studio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, coordinates: Coordinates) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &coordinates.latitude.to_string())
            .append_pair("longitude", &coordinates.longitude.to_string())
            .append_pair("localityLanguage", "en");
        url
    }
}

impl ReverseGeocoder for HttpGeocoder {
    async fn country_at(&self, coordinates: Coordinates) -> Result<Option<String>, ApiError> {
        let response = self.client.get(self.request_url(coordinates)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: describe_error_body(status.as_u16(), &body),
            });
        }

        let parsed: GeocodeResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("{e} (body: {})", excerpt(&body))))?;
        Ok(parsed.into_country())
    }
}
