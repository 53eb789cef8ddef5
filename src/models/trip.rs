use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LatLng, Position};

/// Trip lifecycle phase. Exactly one live TripStats exists per phase != Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripPhase {
    Idle,
    Active,
    Paused,
    Ended,
}

/// Live/aggregate statistics for one trip.
///
/// Created at trip start, mutated only by position ingestion, finalized by
/// the state machine at trip end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripStats {
    pub start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
    pub total_distance_km: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub current_speed_kmh: f64,
    /// Current elevation for display; 0 while no fix carried altitude
    pub elevation_m: f64,
    pub min_elevation_m: Option<f64>,
    pub max_elevation_m: Option<f64>,
    pub elevation_gain_m: f64,
    pub start_location: String,
    pub end_location: String,
    pub positions: Vec<Position>,
    /// Road-matched polyline produced by the route optimizer, if any
    pub route: Option<Vec<LatLng>>,
}

impl TripStats {
    /// Fresh statistics for a trip starting now.
    pub fn begin(start_time_ms: i64) -> Self {
        Self {
            start_time_ms: Some(start_time_ms),
            ..Self::default()
        }
    }
}

impl Default for TripStats {
    fn default() -> Self {
        Self {
            start_time_ms: None,
            end_time_ms: None,
            total_distance_km: 0.0,
            max_speed_kmh: 0.0,
            avg_speed_kmh: 0.0,
            current_speed_kmh: 0.0,
            elevation_m: 0.0,
            min_elevation_m: None,
            max_elevation_m: None,
            elevation_gain_m: 0.0,
            start_location: "Unknown".to_string(),
            end_location: "Unknown".to_string(),
            positions: Vec::new(),
            route: None,
        }
    }
}

/// A completed trip as stored in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Display duration, HH:MM:SS of active (non-paused) time
    pub duration: String,
    pub total_distance_km: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub min_elevation_m: Option<f64>,
    pub max_elevation_m: Option<f64>,
    pub elevation_gain_m: f64,
    pub start_location: String,
    pub end_location: String,
    pub route: Option<Vec<LatLng>>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Build the archive record from finalized statistics.
    ///
    /// `active_ms` is elapsed wall-clock time minus accumulated pauses.
    pub fn from_stats(stats: &TripStats, active_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: millis_to_datetime(stats.start_time_ms.unwrap_or(0)),
            ended_at: stats.end_time_ms.map(millis_to_datetime),
            duration: format_duration(active_ms),
            total_distance_km: stats.total_distance_km,
            max_speed_kmh: stats.max_speed_kmh,
            avg_speed_kmh: stats.avg_speed_kmh,
            min_elevation_m: stats.min_elevation_m,
            max_elevation_m: stats.max_elevation_m,
            elevation_gain_m: stats.elevation_gain_m,
            start_location: stats.start_location.clone(),
            end_location: stats.end_location.clone(),
            route: stats.route.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Format milliseconds as HH:MM:SS.
pub fn format_duration(milliseconds: i64) -> String {
    let seconds = milliseconds.max(0) / 1000;
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
}
