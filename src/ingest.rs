//! Turns an uploaded file into stop records.
//!
//! A header naming both a latitude and a longitude column selects the tabular
//! parse. Anything else is read as one place name per line and geocoded.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use futures::future::try_join_all;
use log::*;

use crate::data::{Destination, PropertyValue};
use crate::error::IngestError;
use crate::identifier::new_id;
use crate::services::geocoding::AddressResolver;

pub const NOT_FOUND_MESSAGE: &str = "The query above returned no results from our Geocoder";
const INVALID_COORDINATES_MESSAGE: &str = "The latitude or longitude of this row is not a number";

/// Reads `path` and resolves its contents.
pub async fn load_file<R>(path: &Path, resolver: &R) -> Result<Vec<Destination>, IngestError>
where
    R: AddressResolver + ?Sized,
{
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    trace!("Read {} bytes from {}.", contents.len(), path.display());
    resolve(&contents, resolver).await
}

pub async fn resolve<R>(contents: &str, resolver: &R) -> Result<Vec<Destination>, IngestError>
where
    R: AddressResolver + ?Sized,
{
    let (header, rows) = contents.split_once('\n').unwrap_or((contents, ""));
    if has_coordinate_columns(header) {
        debug!("Header has coordinate columns, parsing as CSV.");
        return Ok(parse_tabular(&format!("{}\n{}", header.to_lowercase(), rows)));
    }
    geocode_lines(contents, resolver).await
}

pub fn has_coordinate_columns(header: &str) -> bool {
    let header = header.to_lowercase();
    header.contains("latitude") && header.contains("longitude")
}

fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value.and_then(|value| value.parse::<f64>().ok()).filter(|value| value.is_finite())
}

/// Parses CSV whose header is already lowercased. Every column other than
/// the coordinates is kept verbatim in the record's properties.
fn parse_tabular(contents: &str) -> Vec<Destination> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(contents.as_bytes());
    let columns: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_owned).collect(),
        Err(why) => {
            warn!("Unreadable CSV header: {}", why);
            return Vec::new();
        }
    };

    let mut places = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(why) => {
                warn!("Skipping unreadable row {}: {}", index + 1, why);
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut latitude = None;
        let mut longitude = None;
        let mut properties = BTreeMap::new();
        for (column, value) in columns.iter().zip(record.iter()) {
            match column.as_str() {
                "latitude" => latitude = Some(value),
                "longitude" => longitude = Some(value),
                _ => {
                    properties.insert(column.clone(), PropertyValue::from(value));
                }
            }
        }

        let coordinates = (parse_coordinate(latitude), parse_coordinate(longitude));
        let (latitude, longitude) = match coordinates {
            (Some(latitude), Some(longitude)) => (latitude, longitude),
            _ => {
                warn!("Row {} has no usable coordinates.", index + 1);
                properties.insert("invalidCoordinates".into(), INVALID_COORDINATES_MESSAGE.into());
                (0.0, 0.0)
            }
        };
        let text = |key: &str| match properties.get(key) {
            Some(PropertyValue::Text(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        };
        let title = text("title").unwrap_or_default();
        let id = text("id").unwrap_or_else(new_id);

        places.push(Destination {
            id,
            title,
            latitude,
            longitude,
            properties,
        });
    }
    places
}

async fn geocode_line<R>(line: &str, resolver: &R) -> Result<Destination, IngestError>
where
    R: AddressResolver + ?Sized,
{
    let candidates = resolver
        .geocode(line)
        .await
        .map_err(|source| IngestError::Transport {
            line: line.to_owned(),
            source,
        })?;
    match candidates.first() {
        Some(candidate) => Ok(Destination::new(
            new_id(),
            line,
            candidate.latitude,
            candidate.longitude,
        )),
        None => {
            debug!("No geocoding results for {:?}.", line);
            let mut place = Destination::new(new_id(), line, 0.0, 0.0);
            place
                .properties
                .insert("notFound".into(), NOT_FOUND_MESSAGE.into());
            Ok(place)
        }
    }
}

/// Geocodes every non-empty line concurrently; results keep line order.
async fn geocode_lines<R>(contents: &str, resolver: &R) -> Result<Vec<Destination>, IngestError>
where
    R: AddressResolver + ?Sized,
{
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    debug!("Geocoding {} places.", lines.len());
    try_join_all(lines.into_iter().map(|line| geocode_line(line, resolver))).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::GenericError;
    use crate::services::geocoding::Candidate;

    #[derive(Default)]
    struct FakeGeocoder {
        known: HashMap<&'static str, (f64, f64)>,
        failing: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AddressResolver for FakeGeocoder {
        async fn geocode(&self, query: &str) -> Result<Vec<Candidate>, GenericError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing == Some(query) {
                return Err("connection reset".into());
            }
            Ok(self
                .known
                .get(query)
                .map(|&(latitude, longitude)| Candidate {
                    latitude,
                    longitude,
                    label: Some(query.to_owned()),
                })
                .into_iter()
                .collect())
        }
    }

    #[test]
    fn detects_coordinate_headers_case_insensitively() {
        assert!(has_coordinate_columns("Title,Latitude,LONGITUDE"));
        assert!(!has_coordinate_columns("Paris"));
        assert!(!has_coordinate_columns("latitude,title"));
    }

    #[tokio::test]
    async fn tabular_input_makes_no_external_calls() {
        let geocoder = FakeGeocoder::default();
        let contents = "latitude,longitude,title\n48.8566,2.3522,Paris\n51.5072,-0.1276,London\n";
        let places = resolve(contents, &geocoder).await.unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(places[0].title, "Paris");
        assert_eq!(places[0].latitude, 48.8566);
        assert_eq!(places[1].longitude, -0.1276);
        assert_eq!(places[1].properties["title"], PropertyValue::from("London"));
        assert!(!places[0].properties.contains_key("latitude"));
        assert_ne!(places[0].id, places[1].id);
    }

    #[tokio::test]
    async fn tabular_input_keeps_ids_and_extra_columns() {
        let geocoder = FakeGeocoder::default();
        let contents =
            "ID,Title,Latitude,Longitude,Notes\r\nx1,\"Rome, Italy\",41.9,12.5,pasta\r\n";
        let places = resolve(contents, &geocoder).await.unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, "x1");
        assert_eq!(places[0].title, "Rome, Italy");
        assert_eq!(places[0].properties["notes"], PropertyValue::from("pasta"));
    }

    #[tokio::test]
    async fn tabular_row_without_numbers_is_flagged() {
        let geocoder = FakeGeocoder::default();
        let places = resolve("latitude,longitude,title\nnorth,east,Somewhere\n", &geocoder)
            .await
            .unwrap();
        assert_eq!((places[0].latitude, places[0].longitude), (0.0, 0.0));
        assert!(places[0].properties.contains_key("invalidCoordinates"));
    }

    #[tokio::test]
    async fn unresolved_lines_become_placeholders() {
        let geocoder = FakeGeocoder {
            known: HashMap::from([("Paris", (48.8566, 2.3522))]),
            ..FakeGeocoder::default()
        };
        let places = resolve("Paris\nNowhereLandXYZ", &geocoder).await.unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].title, "Paris");
        assert_eq!((places[0].latitude, places[0].longitude), (48.8566, 2.3522));
        assert!(places[0].properties.is_empty());
        assert_eq!(places[1].title, "NowhereLandXYZ");
        assert_eq!((places[1].latitude, places[1].longitude), (0.0, 0.0));
        assert_eq!(places[1].properties["notFound"], PropertyValue::from(NOT_FOUND_MESSAGE));
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let geocoder = FakeGeocoder::default();
        let places = resolve("\nOslo\r\n\n  \nBergen\n", &geocoder).await.unwrap();
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            places.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(),
            vec!["Oslo", "Bergen"]
        );
    }

    #[tokio::test]
    async fn transport_failure_fails_the_batch() {
        let geocoder = FakeGeocoder {
            failing: Some("Lima"),
            ..FakeGeocoder::default()
        };
        let result = resolve("Quito\nLima\nCusco", &geocoder).await;
        match result {
            Err(IngestError::Transport { line, .. }) => assert_eq!(line, "Lima"),
            other => panic!("expected a transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let geocoder = FakeGeocoder::default();
        let result = load_file(Path::new("/definitely/not/here.csv"), &geocoder).await;
        assert!(matches!(result, Err(IngestError::Read { .. })));
    }
}
