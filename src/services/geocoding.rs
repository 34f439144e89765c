use async_trait::async_trait;
use google_maps::geocoding::{GeocodingError, GeocodingStatus};
use google_maps::{GoogleMapsClient, GoogleMapsError};
use log::*;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use crate::config::Config;
use crate::geo::LngLat;
use crate::GenericError;

use super::{check_status, encode_segment};

/// One match for a free-text place query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub latitude: f64,
    pub longitude: f64,
    pub label: Option<String>,
}

/// Resolves a place name to candidate coordinates, best match first.
/// No match is an empty list, not an error.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Vec<Candidate>, GenericError>;
}

pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<GeocodingFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodingFeature {
    center: LngLat,
    #[serde(default)]
    place_name: Option<String>,
}

impl MapboxGeocoder {
    pub fn new(config: &Config) -> Result<Self, GenericError> {
        Ok(MapboxGeocoder::with_base_url(
            &config.mapbox_api_base,
            config.mapbox_token()?,
        ))
    }

    pub fn with_base_url(base_url: &str, access_token: &str) -> Self {
        MapboxGeocoder {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: access_token.to_owned(),
        }
    }
}

#[async_trait]
impl AddressResolver for MapboxGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<Candidate>, GenericError> {
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json",
            self.base_url,
            encode_segment(query)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;
        let response: GeocodingResponse = check_status("Mapbox geocoding", response)?.json().await?;
        trace!(
            "Received {} candidates from Mapbox geocoding API.",
            response.features.len()
        );
        Ok(response
            .features
            .into_iter()
            .map(|feature| Candidate {
                latitude: feature.center[1],
                longitude: feature.center[0],
                label: feature.place_name,
            })
            .collect())
    }
}

pub struct GoogleMapsService {
    client: GoogleMapsClient,
}

impl GoogleMapsService {
    pub fn new(config: &Config) -> Result<Self, GenericError> {
        Ok(GoogleMapsService {
            client: GoogleMapsClient::new(config.google_maps_token()?),
        })
    }
}

#[async_trait]
impl AddressResolver for GoogleMapsService {
    async fn geocode(&self, query: &str) -> Result<Vec<Candidate>, GenericError> {
        let response = match self.client.geocoding().with_address(query).execute().await {
            Ok(response) => response,
            Err(why) if is_zero_results(&why) => {
                trace!("Google Maps geocoding API found nothing for {:?}.", query);
                return Ok(Vec::new());
            }
            Err(why) => return Err(why.into()),
        };
        trace!("Received coordinates from Google Maps geocoding API.");
        Ok(response
            .results
            .iter()
            .filter_map(|result| {
                let coordinates = &result.geometry.location;
                Some(Candidate {
                    latitude: coordinates.lat.to_f64()?,
                    longitude: coordinates.lng.to_f64()?,
                    label: None,
                })
            })
            .collect())
    }
}

/// The client reports a `ZERO_RESULTS` status as an error.
fn is_zero_results(error: &GoogleMapsError) -> bool {
    matches!(
        error,
        GoogleMapsError::Geocoding(GeocodingError::GoogleMapsService(
            GeocodingStatus::ZeroResults,
            _
        ))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_results_status_is_recognised() {
        let error = GoogleMapsError::from(GeocodingError::GoogleMapsService(
            GeocodingStatus::ZeroResults,
            None,
        ));
        assert!(is_zero_results(&error));
    }

    #[test]
    fn other_statuses_are_failures() {
        let denied = GoogleMapsError::from(GeocodingError::GoogleMapsService(
            GeocodingStatus::RequestDenied,
            Some("bad key".into()),
        ));
        assert!(!is_zero_results(&denied));
        assert!(!is_zero_results(&GoogleMapsError::from(GeocodingError::QueryNotBuilt)));
    }
}
