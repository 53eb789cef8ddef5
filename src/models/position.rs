use serde::{Deserialize, Serialize};

/// A single polyline vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One raw location fix as delivered by the location source.
///
/// Altitude and speed are optional: consumer GPS hardware frequently omits
/// one or both, and the ingestion pipeline degrades per field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees (WGS84)
    pub lat: f64,
    /// Longitude in degrees (WGS84)
    pub lng: f64,
    /// Altitude in meters, if the fix carried one
    pub altitude_m: Option<f64>,
    /// Instantaneous speed in meters/second, if the fix carried one
    pub speed_mps: Option<f64>,
    /// Capture timestamp in monotonic milliseconds. The epoch is the
    /// source's own; consumers only ever use differences.
    pub timestamp_ms: i64,
}

impl Position {
    pub fn new(lat: f64, lng: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lng,
            altitude_m: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}
