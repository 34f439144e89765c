use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::config::{Config, GeocoderKind};
use crate::{GenericError, ItineraryError};

use geocoding::{AddressResolver, GoogleMapsService, MapboxGeocoder};

pub mod geocoding;
pub mod nearby;

/// Characters escaped in a URL path segment; ids like `mapbox.mapbox-streets-v8` pass through.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

fn encode_segment(segment: &str) -> String {
    percent_encoding::utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ItineraryError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ItineraryError::UnexpectedStatus {
            service,
            status: status.as_u16(),
        })
    }
}

/// The address resolver selected by `GEOCODER`.
pub fn address_resolver(config: &Config) -> Result<Arc<dyn AddressResolver>, GenericError> {
    Ok(match config.geocoder {
        GeocoderKind::Mapbox => Arc::new(MapboxGeocoder::new(config)?),
        GeocoderKind::Google => Arc::new(GoogleMapsService::new(config)?),
    })
}
