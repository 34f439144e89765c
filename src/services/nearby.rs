use async_trait::async_trait;
use log::*;

use crate::config::Config;
use crate::geo::{FeatureCollection, LngLat};
use crate::{GenericError, ItineraryError};

use super::{check_status, encode_segment};

/// Labelled points of interest around a coordinate.
#[async_trait]
pub trait NearbyPoiService: Send + Sync {
    async fn find_nearby(
        &self,
        tileset: &str,
        lng_lat: LngLat,
    ) -> Result<FeatureCollection, GenericError>;
}

/// Mapbox Tilequery against the `poi_label` layer of a tileset.
pub struct MapboxTilequery {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    radius_meters: u32,
    limit: u32,
}

impl MapboxTilequery {
    /// A missing access token only fails once a search is attempted.
    pub fn new(config: &Config) -> Self {
        MapboxTilequery {
            client: reqwest::Client::new(),
            base_url: config.mapbox_api_base.trim_end_matches('/').to_owned(),
            access_token: config.mapbox_access_token.clone(),
            radius_meters: config.nearby_radius_meters,
            limit: config.nearby_limit,
        }
    }

    pub fn with_base_url(base_url: &str, access_token: &str) -> Self {
        MapboxTilequery {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: Some(access_token.to_owned()),
            radius_meters: 10_000,
            limit: 20,
        }
    }
}

#[async_trait]
impl NearbyPoiService for MapboxTilequery {
    async fn find_nearby(
        &self,
        tileset: &str,
        lng_lat: LngLat,
    ) -> Result<FeatureCollection, GenericError> {
        let [lng, lat] = lng_lat;
        let url = format!(
            "{}/v4/{}/tilequery/{},{}.json",
            self.base_url,
            encode_segment(tileset),
            lng,
            lat
        );
        let access_token = self
            .access_token
            .as_deref()
            .ok_or_else(|| ItineraryError::MissingConfig("MAPBOX_ACCESS_TOKEN".into()))?;
        let radius = self.radius_meters.to_string();
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", access_token),
                ("radius", radius.as_str()),
                ("geometry", "point"),
                ("layers", "poi_label"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let collection: FeatureCollection =
            check_status("Mapbox tilequery", response)?.json().await?;
        trace!(
            "Received {} nearby features from Mapbox tilequery API.",
            collection.features.len()
        );
        Ok(collection)
    }
}
