//! GeoJSON shaped geometry and the spherical math behind route arcs.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `[longitude, latitude]` in degrees, GeoJSON axis order.
pub type LngLat = [f64; 2];

/// Interpolation density of a route arc.
pub const ARC_POINTS: usize = 50;

/// Angular separation, in radians, below which two points count as one.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: LngLat },
    MultiPoint { coordinates: Vec<LngLat> },
    LineString { coordinates: Vec<LngLat> },
    MultiLineString { coordinates: Vec<Vec<LngLat>> },
    Polygon { coordinates: Vec<Vec<LngLat>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub kind: FeatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    pub fn point(coordinates: LngLat, properties: Map<String, Value>) -> Self {
        Feature {
            kind: FeatureKind::Feature,
            id: None,
            properties,
            geometry: Geometry::Point { coordinates },
        }
    }

    pub fn line_string(coordinates: Vec<LngLat>) -> Self {
        Feature {
            kind: FeatureKind::Feature,
            id: None,
            properties: Map::new(),
            geometry: Geometry::LineString { coordinates },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(Value::String(id.into()));
        self
    }

    /// Identifier as text; numeric ids (as the tilequery API returns) are formatted.
    pub fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }
}

/// Smallest longitude/latitude box holding every extended point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[LngLat; 2]", from = "[LngLat; 2]")]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn at([lng, lat]: LngLat) -> Self {
        Bounds {
            west: lng,
            south: lat,
            east: lng,
            north: lat,
        }
    }

    pub fn extend(&mut self, [lng, lat]: LngLat) {
        self.west = self.west.min(lng);
        self.south = self.south.min(lat);
        self.east = self.east.max(lng);
        self.north = self.north.max(lat);
    }

    /// `None` for an empty iterator.
    pub fn enclosing(points: impl IntoIterator<Item = LngLat>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, point| match bounds {
            None => Some(Bounds::at(point)),
            Some(mut bounds) => {
                bounds.extend(point);
                Some(bounds)
            }
        })
    }
}

impl From<Bounds> for [LngLat; 2] {
    fn from(bounds: Bounds) -> Self {
        [[bounds.west, bounds.south], [bounds.east, bounds.north]]
    }
}

impl From<[LngLat; 2]> for Bounds {
    fn from([[west, south], [east, north]]: [LngLat; 2]) -> Self {
        Bounds {
            west,
            south,
            east,
            north,
        }
    }
}

type Vec3 = [f64; 3];

fn to_unit_vector([lng, lat]: LngLat) -> Vec3 {
    let (lng, lat) = (lng.to_radians(), lat.to_radians());
    [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
}

fn to_lng_lat([x, y, z]: Vec3) -> LngLat {
    let lat = z.atan2((x * x + y * y).sqrt());
    let lng = y.atan2(x);
    [lng.to_degrees(), lat.to_degrees()]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

fn scale(a: Vec3, k: f64) -> Vec3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Unit vector at a right angle to `a`, used when the plane of an arc is undefined.
fn perpendicular(a: Vec3) -> Vec3 {
    let candidate = cross(a, [0.0, 0.0, 1.0]);
    let candidate = if norm(candidate) < 1e-9 {
        cross(a, [1.0, 0.0, 0.0])
    } else {
        candidate
    };
    scale(candidate, 1.0 / norm(candidate))
}

/// Shortest path between two points on the sphere, sampled at `npoints`
/// evenly spaced fractions (at least two). Longitudes are unwrapped so the
/// line never jumps across the antimeridian.
pub fn great_circle(start: LngLat, end: LngLat, npoints: usize) -> Vec<LngLat> {
    let npoints = npoints.max(2);
    let a = to_unit_vector(start);
    let b = to_unit_vector(end);
    let distance = norm(cross(a, b)).atan2(dot(a, b));

    let mut line: Vec<LngLat> = (0..npoints)
        .map(|i| {
            if i == 0 {
                return start;
            }
            if i == npoints - 1 {
                return end;
            }
            let f = i as f64 / (npoints - 1) as f64;
            if distance < EPSILON {
                start
            } else if distance > FRAC_PI_2 && distance.sin() < EPSILON {
                let p = perpendicular(a);
                to_lng_lat(add(scale(a, (f * PI).cos()), scale(p, (f * PI).sin())))
            } else {
                let ka = ((1.0 - f) * distance).sin() / distance.sin();
                let kb = (f * distance).sin() / distance.sin();
                to_lng_lat(add(scale(a, ka), scale(b, kb)))
            }
        })
        .collect();

    for i in 1..line.len() {
        let previous = line[i - 1][0];
        let lng = &mut line[i][0];
        while *lng - previous > 180.0 {
            *lng -= 360.0;
        }
        while *lng - previous < -180.0 {
            *lng += 360.0;
        }
    }
    line
}
