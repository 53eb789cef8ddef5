use crate::models::{Position, RoutePoint, SampleReason};
use crate::services::geo;

/// Speed below which the rider counts as standing still (km/h).
const STOP_SPEED_KMH: f64 = 1.0;
/// Standing still longer than this retains a stop waypoint (ms).
const STOP_DURATION_MS: i64 = 30_000;
/// Bearing change beyond this magnitude retains a waypoint (degrees).
const DIRECTION_THRESHOLD_DEG: f64 = 45.0;
/// Distance from the last waypoint beyond this retains one (km).
const DISTANCE_THRESHOLD_KM: f64 = 0.1;
/// Maximum gap between waypoints before one is forced (ms).
const TIME_THRESHOLD_MS: i64 = 120_000;

/// Reduces the raw fix stream to a sequence of semantically meaningful
/// route waypoints.
///
/// Heuristics are evaluated in a fixed order and the first match wins:
/// start, stop, direction change, distance, time. A fix matching none is
/// dropped from the route (it still feeds trip statistics upstream).
///
/// The bearing baseline is intentionally mixed: the current bearing comes
/// from the previous raw fix, while the comparison value is the bearing
/// stored when the last waypoint was retained. This matches the behavior of
/// the tracking heuristic this sampler reproduces.
#[derive(Debug, Default)]
pub struct RouteSampler {
    points: Vec<RoutePoint>,
    last_retained_bearing: Option<f64>,
    stopped_ms: i64,
    last_fix_ms: Option<i64>,
}

impl RouteSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waypoints retained so far, in arrival order.
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Clear all sampling state for a new trip.
    pub fn reset(&mut self) {
        self.points.clear();
        self.last_retained_bearing = None;
        self.stopped_ms = 0;
        self.last_fix_ms = None;
    }

    /// Consider one fix for retention. `prev` is the previous *raw* logged
    /// position (not the previous waypoint); `speed_kmh` is the current
    /// speed already derived by the ingestion pipeline.
    ///
    /// Returns the retention reason, or `None` if the fix was dropped.
    pub fn observe(
        &mut self,
        prev: Option<&Position>,
        fix: &Position,
        speed_kmh: f64,
    ) -> Option<SampleReason> {
        let dt_ms = self
            .last_fix_ms
            .map(|t| (fix.timestamp_ms - t).max(0))
            .unwrap_or(0);
        self.last_fix_ms = Some(fix.timestamp_ms);

        // Stopped time accumulates while below the stop speed and resets
        // the moment movement resumes.
        if speed_kmh < STOP_SPEED_KMH {
            self.stopped_ms += dt_ms;
        } else {
            self.stopped_ms = 0;
        }

        let bearing = prev.map(|p| geo::bearing_degrees(p.lat, p.lng, fix.lat, fix.lng));

        let reason = match self.points.last() {
            None => Some(SampleReason::Start),
            Some(last) => {
                if speed_kmh < STOP_SPEED_KMH && self.stopped_ms > STOP_DURATION_MS {
                    Some(SampleReason::Stop)
                } else if self.bearing_changed(bearing) {
                    Some(SampleReason::DirectionChange)
                } else if geo::distance_km(last.lat, last.lng, fix.lat, fix.lng)
                    > DISTANCE_THRESHOLD_KM
                {
                    Some(SampleReason::Distance)
                } else if fix.timestamp_ms - last.timestamp_ms > TIME_THRESHOLD_MS {
                    Some(SampleReason::Time)
                } else {
                    None
                }
            }
        };

        if let Some(reason) = reason {
            self.points.push(RoutePoint {
                lat: fix.lat,
                lng: fix.lng,
                timestamp_ms: fix.timestamp_ms,
                speed_kmh,
                reason,
            });
            self.last_retained_bearing = bearing;
            log::debug!(
                "retained route point ({:.5}, {:.5}) reason={}",
                fix.lat,
                fix.lng,
                reason.as_str()
            );
        }
        reason
    }

    fn bearing_changed(&self, bearing: Option<f64>) -> bool {
        match (self.last_retained_bearing, bearing) {
            (Some(retained), Some(current)) => {
                geo::bearing_delta(retained, current).abs() > DIRECTION_THRESHOLD_DEG
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lng: f64, ts: i64) -> Position {
        Position::new(lat, lng, ts)
    }

    #[test]
    fn test_first_fix_always_retained_as_start() {
        let mut sampler = RouteSampler::new();
        let reason = sampler.observe(None, &fix(52.52, 13.405, 0), 20.0);
        assert_eq!(reason, Some(SampleReason::Start));
        assert_eq!(sampler.points().len(), 1);
    }

    #[test]
    fn test_small_moves_retain_only_first_point() {
        // Moves < 100 m, bearing steady, < 120 s apart, speed >= 1 km/h
        let mut sampler = RouteSampler::new();
        let mut prev: Option<Position> = None;
        for i in 0..10 {
            // ~5.6 m north per step, every 5 s
            let f = fix(52.52 + i as f64 * 0.00005, 13.405, i * 5_000);
            let reason = sampler.observe(prev.as_ref(), &f, 10.0);
            if i == 0 {
                assert_eq!(reason, Some(SampleReason::Start));
            } else {
                assert_eq!(reason, None, "fix {i} should be dropped");
            }
            prev = Some(f);
        }
        assert_eq!(sampler.points().len(), 1);
    }

    #[test]
    fn test_stop_retained_after_threshold() {
        let mut sampler = RouteSampler::new();
        let mut prev: Option<Position> = None;
        let mut retained_stop = false;
        // Standing still, fixes every 10 s
        for i in 0..5 {
            let f = fix(52.52, 13.405, i * 10_000);
            let reason = sampler.observe(prev.as_ref(), &f, 0.3);
            // 30 001 ms of accumulated standstill crosses the threshold at i=4
            if i * 10_000 > 30_000 {
                assert_eq!(reason, Some(SampleReason::Stop));
                retained_stop = true;
            }
            prev = Some(f);
        }
        assert!(retained_stop);
    }

    #[test]
    fn test_continued_standstill_keeps_retaining_stops() {
        // Retention does not reset the accumulator: every fix past the
        // threshold is a stop point until movement resumes.
        let mut sampler = RouteSampler::new();
        let mut prev: Option<Position> = None;
        let mut stops = 0;
        for i in 0..8 {
            let f = fix(52.52, 13.405, i * 10_000);
            if sampler.observe(prev.as_ref(), &f, 0.0) == Some(SampleReason::Stop) {
                stops += 1;
            }
            prev = Some(f);
        }
        assert_eq!(stops, 4);

        let moving = fix(52.5201, 13.405, 90_000);
        let reason = sampler.observe(prev.as_ref(), &moving, 10.0);
        assert_ne!(reason, Some(SampleReason::Stop));
    }

    #[test]
    fn test_movement_resets_stopped_duration() {
        let mut sampler = RouteSampler::new();
        let start = fix(52.52, 13.405, 0);
        sampler.observe(None, &start, 0.0);
        // 25 s standing still
        let still = fix(52.52, 13.405, 25_000);
        assert_eq!(sampler.observe(Some(&start), &still, 0.0), None);
        // Brief movement resets the accumulator
        let moving = fix(52.5201, 13.405, 30_000);
        sampler.observe(Some(&still), &moving, 5.0);
        // Another 20 s standing still is not enough for a stop point
        let still_again = fix(52.5201, 13.405, 50_000);
        let reason = sampler.observe(Some(&moving), &still_again, 0.0);
        assert_ne!(reason, Some(SampleReason::Stop));
    }

    #[test]
    fn test_direction_change_retained() {
        let mut sampler = RouteSampler::new();
        // Head due north long enough to retain a waypoint whose stored
        // bearing is 0 degrees
        let a = fix(52.52, 13.405, 0);
        let b = fix(52.5205, 13.405, 10_000);
        let c = fix(52.5215, 13.405, 20_000);
        sampler.observe(None, &a, 20.0);
        sampler.observe(Some(&a), &b, 20.0);
        let reason = sampler.observe(Some(&b), &c, 20.0);
        assert_eq!(reason, Some(SampleReason::Distance));
        // Now turn due east: bearing 90 deg vs retained 0 deg
        let d = fix(52.5215, 13.4055, 30_000);
        let reason = sampler.observe(Some(&c), &d, 20.0);
        assert_eq!(reason, Some(SampleReason::DirectionChange));
    }

    #[test]
    fn test_distance_threshold_retains() {
        let mut sampler = RouteSampler::new();
        let a = fix(52.52, 13.405, 0);
        sampler.observe(None, &a, 30.0);
        // ~111 m north of the start
        let b = fix(52.521, 13.405, 10_000);
        let reason = sampler.observe(Some(&a), &b, 30.0);
        assert_eq!(reason, Some(SampleReason::Distance));
    }

    #[test]
    fn test_time_threshold_retains() {
        let mut sampler = RouteSampler::new();
        let a = fix(52.52, 13.405, 0);
        sampler.observe(None, &a, 5.0);
        // Same spot (crawling, never fully stopped), 121 s later
        let b = fix(52.520005, 13.405, 121_000);
        let reason = sampler.observe(Some(&a), &b, 5.0);
        assert_eq!(reason, Some(SampleReason::Time));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut sampler = RouteSampler::new();
        sampler.observe(None, &fix(52.52, 13.405, 0), 10.0);
        assert_eq!(sampler.points().len(), 1);
        sampler.reset();
        assert!(sampler.points().is_empty());
        assert_eq!(
            sampler.observe(None, &fix(52.53, 13.41, 0), 10.0),
            Some(SampleReason::Start)
        );
    }
}
