use std::collections::BTreeMap;

use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::geo::{Feature, FeatureCollection, LngLat};

/// A single stop of the itinerary.
///
/// `properties` holds whatever columns the import source carried beyond the
/// core fields (e.g. a `notFound` flag from geocoding). Editable metadata lives
/// in [`DestinationProperties`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Destination {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Destination {
            id: id.into(),
            title: title.into(),
            latitude,
            longitude,
            properties: BTreeMap::new(),
        }
    }

    pub fn lng_lat(&self) -> LngLat {
        [self.longitude, self.latitude]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Poi {
    /// Highlight feature mirrored into the selected POI collection.
    pub fn to_feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert("name".into(), self.name.clone().into());
        Feature::point([self.longitude, self.latitude], properties).with_id(self.id.clone())
    }
}

/// Free-form property value. Owned all the way down, so `clone` is a deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<PropertyValue>),
    Record(BTreeMap<String, PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_owned())
    }
}

impl PropertyValue {
    fn to_poi(&self) -> Option<Poi> {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

/// Keys a property write may not touch because the merged record already
/// uses them for the stop itself.
const RESERVED_KEYS: [&str; 5] = ["id", "title", "latitude", "longitude", "properties"];

/// Attributes describing the destination.
///
/// Kept apart from [`Destination`] so editing metadata never rebuilds the
/// route geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationProperties {
    pub length_of_stay: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub pois: Vec<Poi>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

impl Default for DestinationProperties {
    fn default() -> Self {
        DestinationProperties {
            length_of_stay: 1.0,
            description: None,
            image_url: None,
            pois: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl DestinationProperties {
    /// Writes `value` under `key`, copying it. Known fields only accept their
    /// own shape; returns `false` (and changes nothing) otherwise.
    pub fn set(&mut self, key: &str, value: &PropertyValue) -> bool {
        match (key, value) {
            ("lengthOfStay", PropertyValue::Number(days)) => self.length_of_stay = *days,
            ("description", PropertyValue::Text(text)) => self.description = Some(text.clone()),
            ("imageURL", PropertyValue::Text(url)) => self.image_url = Some(url.clone()),
            ("pois", PropertyValue::List(items)) => {
                match items.iter().map(PropertyValue::to_poi).collect::<Option<Vec<_>>>() {
                    Some(pois) => self.pois = pois,
                    None => return false,
                }
            }
            ("lengthOfStay" | "description" | "imageURL" | "pois", _) => return false,
            (key, _) if RESERVED_KEYS.contains(&key) => return false,
            (key, value) => {
                self.extra.insert(key.to_owned(), value.clone());
            }
        }
        true
    }
}

/// A stop merged with its metadata, as handed to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationWithProperties {
    #[serde(flatten)]
    pub destination: Destination,
    #[serde(flatten)]
    pub properties: DestinationProperties,
}

/// Represents a trip itinerary that can be viewed on a map.
///
/// Stop data is duplicated in `stops` and in the `points` collection so
/// either consumer can read it without a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedItinerary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub stops: BTreeMap<String, DestinationWithProperties>,
    pub sequence: Vec<String>,
    pub points: FeatureCollection,
    pub paths: FeatureCollection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_are_typed() {
        let mut properties = DestinationProperties::default();
        assert!(properties.set("lengthOfStay", &PropertyValue::Number(3.0)));
        assert!(properties.set("description", &"Old town".into()));
        assert_eq!(properties.length_of_stay, 3.0);
        assert_eq!(properties.description.as_deref(), Some("Old town"));
        assert!(properties.extra.is_empty());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut properties = DestinationProperties::default();
        assert!(!properties.set("lengthOfStay", &"three".into()));
        assert!(!properties.set("title", &"renamed".into()));
        assert_eq!(properties, DestinationProperties::default());
    }

    #[test]
    fn pois_can_be_written_as_records() {
        let record: BTreeMap<String, PropertyValue> = [
            ("id".to_string(), PropertyValue::from("p1")),
            ("name".to_string(), PropertyValue::from("Cafe")),
            ("latitude".to_string(), PropertyValue::Number(1.0)),
            ("longitude".to_string(), PropertyValue::Number(2.0)),
        ]
        .into_iter()
        .collect();
        let mut properties = DestinationProperties::default();
        assert!(properties.set("pois", &PropertyValue::List(vec![record.into()])));
        assert_eq!(properties.pois.len(), 1);
        assert_eq!(properties.pois[0].name, "Cafe");
    }

    #[test]
    fn merged_record_serializes_flat() {
        let merged = DestinationWithProperties {
            destination: Destination::new("1a", "Lisbon", 38.7, -9.1),
            properties: DestinationProperties {
                image_url: Some("a.jpg".into()),
                ..DestinationProperties::default()
            },
        };
        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json["id"], "1a");
        assert_eq!(json["lengthOfStay"], 1.0);
        assert_eq!(json["imageURL"], "a.jpg");
        assert!(json["pois"].as_array().unwrap().is_empty());
    }
}
