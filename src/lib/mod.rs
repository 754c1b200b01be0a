//! Field inspection capture: translates the backend's WKT geometries, measures
//! how far a GPS fix is from project units, drives the capture wizards and
//! keeps track of submitted reports.

pub mod activities;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod gps;
pub mod items;
pub mod output;
pub mod reports;
pub mod store;
pub mod visit;
pub mod wizard;
pub mod wkt;

#[cfg(test)]
mod test_helpers;

pub use self::client::ApiClient;
pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::geo::{distance_to_geometry, haversine_distance, Location};
pub use self::geojson::Geometry;
pub use self::items::{rank_by_distance, NearbyUnit, ProjectUnit};
