//! Country detection command.

use avatar_studio_client::flows::LocationFlow;
use avatar_studio_client::geo::HttpGeocoder;
use avatar_studio_core::Coordinates;

use super::{CommandError, Context};
use crate::output;

/// Reverse-geocode `lat`/`lon` and store the result.
///
/// # Errors
///
/// Returns error if the geocoder client cannot be built or the session cannot
/// be written. Geocoding failures only leave the country empty.
pub async fn locate(ctx: &Context, lat: f64, lon: f64) -> Result<(), CommandError> {
    let geocoder = HttpGeocoder::new(ctx.config.geocoder_url.clone(), ctx.config.request_timeout)?;
    let location = LocationFlow::new(&ctx.store, &geocoder)
        .detect(Coordinates {
            latitude: lat,
            longitude: lon,
        })
        .await?;

    match location.country {
        Some(country) => output::line(format_args!("Detected country: {country}")),
        None => output::line("Could not detect your country. Please enter it manually."),
    }
    Ok(())
}
