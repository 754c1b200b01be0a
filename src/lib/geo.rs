use super::geojson::{Geometry, Pair};
use geo::prelude::*;
use geo::COORD_PRECISION;
use geo_types::{Coordinate, LineString, MultiPoint, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mean earth radius in meters used by every distance in this crate.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Location { lat, lon }
    }
}

impl PartialEq<Location> for Location {
    fn eq(&self, other: &Self) -> bool {
        haversine_distance(self, other) < COORD_PRECISION.into()
    }
}

impl From<&Pair> for Location {
    fn from(coordinates: &Pair) -> Self {
        Location {
            lon: coordinates.0,
            lat: coordinates.1,
        }
    }
}

impl From<Location> for [f64; 2] {
    fn from(loc: Location) -> Self {
        [loc.lon, loc.lat]
    }
}

impl From<Point<f64>> for Location {
    fn from(point: Point<f64>) -> Self {
        Location {
            lat: point.lat(),
            lon: point.lng(),
        }
    }
}

impl From<Coordinate<f64>> for Location {
    fn from(coordinate: Coordinate<f64>) -> Self {
        Location {
            lat: coordinate.y,
            lon: coordinate.x,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, PartialEq, Error)]
#[error("expected <lat>,<lon> but got {0:?}")]
pub struct ParseLocationError(String);

/// Parses `"<lat>,<lon>"`, the order used in map links.
impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLocationError(s.into());
        let mut parts = s.splitn(2, ',');
        let lat: f64 = parts.next().ok_or_else(err)?.trim().parse().map_err(|_| err())?;
        let lon: f64 = parts.next().ok_or_else(err)?.trim().parse().map_err(|_| err())?;
        if lat.is_finite() && lon.is_finite() {
            Ok(Location { lat, lon })
        } else {
            Err(err())
        }
    }
}

/// Great-circle distance in meters between two locations.
pub fn haversine_distance(a: &Location, b: &Location) -> f64 {
    let phi_1 = a.lat.to_radians();
    let phi_2 = b.lat.to_radians();
    let delta_phi = (b.lat - a.lat).to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let h = (delta_phi / 2.).sin().powi(2)
        + phi_1.cos() * phi_2.cos() * (delta_lambda / 2.).sin().powi(2);
    let c = 2. * h.sqrt().atan2((1. - h).sqrt());
    EARTH_RADIUS * c
}

/// Distance in meters from `position` to the closest vertex of `geometry`.
///
/// Only `Point`, `LineString`, `MultiLineString` and `Polygon` are measured;
/// multi-points and multi-polygons yield `None`, like an absent geometry.
pub fn distance_to_geometry(position: &Location, geometry: Option<&Geometry>) -> Option<f64> {
    let geometry = geometry?;
    match geometry {
        Geometry::Point { .. }
        | Geometry::LineString { .. }
        | Geometry::MultiLineString { .. }
        | Geometry::Polygon { .. } => geometry
            .vertices()
            .map(|pair| haversine_distance(position, &pair.into()))
            .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d)))),
        Geometry::MultiPoint { .. } | Geometry::MultiPolygon { .. } => None,
    }
}

/// Map search link for a GeoJSON `[lon, lat]` pair. The query takes
/// `lat,lon`, so the order is swapped here.
pub fn maps_url(coordinates: Pair) -> String {
    let (longitude, latitude) = coordinates;
    format!("{}{},{}", MAPS_SEARCH_URL, latitude, longitude)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Bounds {
    e: f64,
    n: f64,
    s: f64,
    w: f64,
}

impl From<&Bounds> for (Location, Location) {
    fn from(bounds: &Bounds) -> Self {
        let ne = Location {
            lon: bounds.e,
            lat: bounds.n,
        };
        let sw = Location {
            lon: bounds.w,
            lat: bounds.s,
        };

        (ne, sw)
    }
}

impl PartialEq<Bounds> for Bounds {
    fn eq(&self, other: &Self) -> bool {
        let (self_ne, self_sw) = self.into();
        let (other_ne, other_sw) = other.into();
        self_ne == other_ne && self_sw == other_sw
    }
}

fn to_line_string(pairs: &[Pair]) -> LineString<f64> {
    pairs.to_vec().into()
}

pub trait Centerable {
    fn get_centroid(&self) -> Option<Location>;
    fn get_bounds(&self) -> Option<Bounds>;
}

impl Centerable for Geometry {
    fn get_centroid(&self) -> Option<Location> {
        let point = match self {
            Geometry::Point { coordinates } => Some(Point::from(*coordinates)),
            Geometry::LineString { coordinates } => to_line_string(coordinates).centroid(),
            Geometry::Polygon { coordinates } => {
                let exterior = to_line_string(coordinates.first()?);
                Polygon::new(exterior, vec![]).centroid()
            }
            Geometry::MultiPolygon { coordinates } => {
                let polygons: Vec<Polygon<f64>> = coordinates
                    .iter()
                    .filter_map(|rings| rings.first())
                    .map(|ring| Polygon::new(to_line_string(ring), vec![]))
                    .collect();
                geo_types::MultiPolygon(polygons).centroid()
            }
            Geometry::MultiPoint { .. } | Geometry::MultiLineString { .. } => {
                let points: MultiPoint<f64> = self.vertices().copied().collect::<Vec<_>>().into();
                points.centroid()
            }
        }?;
        Some(point.into())
    }

    fn get_bounds(&self) -> Option<Bounds> {
        let points: MultiPoint<f64> = self.vertices().copied().collect::<Vec<_>>().into();
        let rect = points.bounding_rect()?;
        Some(Bounds {
            e: rect.max().x,
            n: rect.max().y,
            s: rect.min().y,
            w: rect.min().x,
        })
    }
}

impl Geometry {
    /// Map link for the geometry: the point itself, or the centroid of
    /// anything larger.
    pub fn maps_url(&self) -> Option<String> {
        match self {
            Geometry::Point { coordinates } => Some(maps_url(*coordinates)),
            _ => {
                let centroid = self.get_centroid()?;
                Some(maps_url((centroid.lon, centroid.lat)))
            }
        }
    }
}
