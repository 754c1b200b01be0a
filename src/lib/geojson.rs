use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A `(longitude, latitude)` pair.
pub type Pair = (f64, f64);

pub const MIN_LINE_VERTICES: usize = 2;
pub const MIN_RING_VERTICES: usize = 3;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Pair,
    },
    LineString {
        coordinates: Vec<Pair>,
    },
    Polygon {
        coordinates: Vec<Vec<Pair>>,
    },
    MultiPoint {
        coordinates: Vec<Pair>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Pair>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Pair>>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported geometry type {0:?}")]
pub struct UnsupportedGeometryType(pub String);

impl FromStr for GeometryType {
    type Err = UnsupportedGeometryType;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "Point" => Ok(GeometryType::Point),
            "LineString" => Ok(GeometryType::LineString),
            "Polygon" => Ok(GeometryType::Polygon),
            "MultiPoint" => Ok(GeometryType::MultiPoint),
            "MultiLineString" => Ok(GeometryType::MultiLineString),
            "MultiPolygon" => Ok(GeometryType::MultiPolygon),
            other => Err(UnsupportedGeometryType(other.into())),
        }
    }
}

fn is_finite_pair(pair: &Pair) -> bool {
    pair.0.is_finite() && pair.1.is_finite()
}

fn is_valid_line(line: &[Pair]) -> bool {
    line.len() >= MIN_LINE_VERTICES && line.iter().all(is_finite_pair)
}

fn is_valid_ring(ring: &[Pair]) -> bool {
    ring.len() >= MIN_RING_VERTICES && ring.iter().all(is_finite_pair)
}

impl Geometry {
    pub fn kind(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
        }
    }

    /// Builds a geometry from a GeoJSON type and its raw coordinate array,
    /// rejecting shapes that break the vertex-count or finiteness rules.
    pub fn from_parts(kind: GeometryType, coordinates: Value) -> Option<Self> {
        let value = json!({ "type": kind.as_str(), "coordinates": coordinates });
        let geometry: Geometry = serde_json::from_value(value).ok()?;
        if geometry.is_valid() {
            Some(geometry)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Point { coordinates } => is_finite_pair(coordinates),
            Geometry::LineString { coordinates } => is_valid_line(coordinates),
            Geometry::MultiPoint { coordinates } => {
                !coordinates.is_empty() && coordinates.iter().all(is_finite_pair)
            }
            Geometry::Polygon { coordinates } => {
                !coordinates.is_empty() && coordinates.iter().all(|r| is_valid_ring(r))
            }
            Geometry::MultiLineString { coordinates } => {
                !coordinates.is_empty() && coordinates.iter().all(|l| is_valid_line(l))
            }
            Geometry::MultiPolygon { coordinates } => {
                !coordinates.is_empty()
                    && coordinates
                        .iter()
                        .all(|p| !p.is_empty() && p.iter().all(|r| is_valid_ring(r)))
            }
        }
    }

    /// Every vertex of the geometry, in storage order.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &Pair> + '_> {
        match self {
            Geometry::Point { coordinates } => Box::new(std::iter::once(coordinates)),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                Box::new(coordinates.iter())
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                Box::new(coordinates.iter().flatten())
            }
            Geometry::MultiPolygon { coordinates } => {
                Box::new(coordinates.iter().flatten().flatten())
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Feature {
        properties: HashMap<String, String>,
        geometry: Option<Geometry>,
    },
    FeatureCollection {
        features: Vec<Entity>,
    },
}
