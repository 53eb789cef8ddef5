use serde::{Deserialize, Serialize};

/// Why a fix was retained as a route waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleReason {
    /// First fix of the trip
    Start,
    /// Standing still longer than the stop threshold
    Stop,
    /// Bearing changed beyond the direction threshold
    DirectionChange,
    /// Moved beyond the distance threshold since the last waypoint
    Distance,
    /// No waypoint retained for longer than the time threshold
    Time,
}

impl SampleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleReason::Start => "start",
            SampleReason::Stop => "stop",
            SampleReason::DirectionChange => "direction-change",
            SampleReason::Distance => "distance",
            SampleReason::Time => "time",
        }
    }
}

/// A retained, semantically significant fix used to reconstruct the
/// travelled path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp_ms: i64,
    pub speed_kmh: f64,
    pub reason: SampleReason,
}
