use std::str::FromStr;

use crate::ItineraryError;

const DEFAULT_MAPBOX_API_BASE: &str = "https://api.mapbox.com";
const DEFAULT_NEARBY_TILESET: &str = "mapbox.mapbox-streets-v8";
const DEFAULT_NEARBY_RADIUS_METERS: u32 = 10_000;
const DEFAULT_NEARBY_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderKind {
    Mapbox,
    Google,
}

impl FromStr for GeocoderKind {
    type Err = ItineraryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mapbox" => Ok(GeocoderKind::Mapbox),
            "google" => Ok(GeocoderKind::Google),
            _ => Err(ItineraryError::UnknownGeocoder(value.to_owned())),
        }
    }
}

/// Settings read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub geocoder: GeocoderKind,
    pub mapbox_access_token: Option<String>,
    pub mapbox_api_base: String,
    pub google_maps_token: Option<String>,
    pub nearby_tileset: String,
    pub nearby_radius_meters: u32,
    pub nearby_limit: u32,
}

fn parse_number(key: &str, value: Option<String>, default: u32) -> Result<u32, ItineraryError> {
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ItineraryError::InvalidConfig {
            key: key.to_owned(),
            value,
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ItineraryError> {
        Config::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ItineraryError> {
        let geocoder = match lookup("GEOCODER") {
            Some(value) => value.parse()?,
            None => GeocoderKind::Mapbox,
        };
        Ok(Config {
            geocoder,
            mapbox_access_token: lookup("MAPBOX_ACCESS_TOKEN"),
            mapbox_api_base: lookup("MAPBOX_API_BASE")
                .unwrap_or_else(|| DEFAULT_MAPBOX_API_BASE.to_owned()),
            google_maps_token: lookup("GOOGLE_MAPS_TOKEN"),
            nearby_tileset: lookup("NEARBY_TILESET")
                .unwrap_or_else(|| DEFAULT_NEARBY_TILESET.to_owned()),
            nearby_radius_meters: parse_number(
                "NEARBY_RADIUS_METERS",
                lookup("NEARBY_RADIUS_METERS"),
                DEFAULT_NEARBY_RADIUS_METERS,
            )?,
            nearby_limit: parse_number(
                "NEARBY_LIMIT",
                lookup("NEARBY_LIMIT"),
                DEFAULT_NEARBY_LIMIT,
            )?,
        })
    }

    pub fn mapbox_token(&self) -> Result<&str, ItineraryError> {
        self.mapbox_access_token
            .as_deref()
            .ok_or_else(|| ItineraryError::MissingConfig("MAPBOX_ACCESS_TOKEN".into()))
    }

    pub fn google_maps_token(&self) -> Result<&str, ItineraryError> {
        self.google_maps_token
            .as_deref()
            .ok_or_else(|| ItineraryError::MissingConfig("GOOGLE_MAPS_TOKEN".into()))
    }
}
