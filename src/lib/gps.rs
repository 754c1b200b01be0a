//! Position acquisition. The device geolocation API lives outside this crate;
//! it is reached through the [`PositionSource`] trait.

use super::geo::Location;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const WATCH_MAXIMUM_AGE: Duration = Duration::from_secs(5);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Milliseconds since the unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
            accuracy: None,
            timestamp: None,
        }
    }
}

impl From<&Coordinates> for Location {
    fn from(coordinates: &Coordinates) -> Self {
        Location {
            lat: coordinates.latitude,
            lon: coordinates.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    /// High accuracy, ten seconds, never a cached fix.
    fn default() -> Self {
        PositionOptions {
            high_accuracy: true,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: Duration::from_secs(0),
        }
    }
}

impl PositionOptions {
    /// Options for continuous tracking, which tolerate slightly stale fixes.
    pub fn watch() -> Self {
        PositionOptions {
            maximum_age: WATCH_MAXIMUM_AGE,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GpsError {
    #[error("geolocation is not available on this device")]
    NotAvailable,

    #[error("location permission denied, enable location access on the device")]
    PermissionDenied,

    #[error("location unavailable, check that GPS is turned on")]
    PositionUnavailable,

    #[error("timed out while acquiring the location")]
    Timeout,
}

pub trait PositionSource {
    fn is_available(&self) -> bool {
        true
    }

    fn current_position(&self, options: &PositionOptions) -> Result<Coordinates, GpsError>;
}

/// A source that always reports the same fix, e.g. coordinates typed on the
/// command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

impl PositionSource for FixedPosition {
    fn current_position(&self, _options: &PositionOptions) -> Result<Coordinates, GpsError> {
        Ok(self.0)
    }
}

pub fn acquire(
    source: &dyn PositionSource,
    options: &PositionOptions,
) -> Result<Coordinates, GpsError> {
    if !source.is_available() {
        warn!("no position source available");
        return Err(GpsError::NotAvailable);
    }
    let result = source.current_position(options);
    match &result {
        Ok(coordinates) => info!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "position acquired"
        ),
        Err(err) => warn!(error = %err, "could not acquire position"),
    }
    result
}

/// Formats coordinates for display, e.g. `4.609700° N, -74.081700° W`.
pub fn format_coordinates(coordinates: &Coordinates) -> String {
    let lat_dir = if coordinates.latitude >= 0. { 'N' } else { 'S' };
    let lon_dir = if coordinates.longitude >= 0. { 'E' } else { 'W' };
    format!(
        "{:.6}° {}, {:.6}° {}",
        coordinates.latitude, lat_dir, coordinates.longitude, lon_dir
    )
}
