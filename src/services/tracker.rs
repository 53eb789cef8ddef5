use anyhow::{bail, Result};

use crate::models::{Position, RoutePoint, TripPhase, TripStats};
use crate::services::geo;
use crate::services::location::LocationError;
use crate::services::sampler::RouteSampler;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Trip lifecycle state machine and kinematics reducer.
///
/// Owns no timers and no subscription: the host delivers fixes, errors and
/// control actions with explicit timestamps, and reads back derived state.
/// Fixes are only processed while the phase is `Active`; statistics mutation
/// is not reentrant, which the `&mut self` entry points enforce.
///
/// Two clocks are in play and never mixed: control transitions carry the
/// host's wall clock, while kinematics run on the location source's own
/// timestamps. Average speed is therefore measured from the first fix, not
/// from `start_time_ms`.
#[derive(Debug)]
pub struct TripTracker {
    phase: TripPhase,
    stats: TripStats,
    sampler: RouteSampler,
    gps_ready: bool,
    first_fix_ms: Option<i64>,
    pause_started_ms: Option<i64>,
    total_paused_ms: i64,
}

impl TripTracker {
    pub fn new() -> Self {
        Self {
            phase: TripPhase::Idle,
            stats: TripStats::default(),
            sampler: RouteSampler::new(),
            gps_ready: false,
            first_fix_ms: None,
            pause_started_ms: None,
            total_paused_ms: 0,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.phase
    }

    pub fn stats(&self) -> &TripStats {
        &self.stats
    }

    pub fn route_points(&self) -> &[RoutePoint] {
        self.sampler.points()
    }

    pub fn gps_ready(&self) -> bool {
        self.gps_ready
    }

    /// Mark location access as probed and working (or revoked).
    pub fn set_gps_ready(&mut self, ready: bool) {
        self.gps_ready = ready;
    }

    /// Elapsed active time: wall clock since start minus accumulated pauses
    /// and any pause still in progress. Zero while idle.
    pub fn elapsed_active_ms(&self, now_ms: i64) -> i64 {
        let Some(start) = self.stats.start_time_ms else {
            return 0;
        };
        let in_progress = self
            .pause_started_ms
            .map(|p| now_ms - p)
            .unwrap_or(0);
        (now_ms - start - self.total_paused_ms - in_progress).max(0)
    }

    /// Begin a new trip. Legal from `Idle`, and from `Active` as a restart
    /// that discards the running trip without passing through `Ended`.
    pub fn start(&mut self, now_ms: i64) -> Result<()> {
        if !self.gps_ready {
            bail!("location access has not been granted");
        }
        match self.phase {
            TripPhase::Idle | TripPhase::Active => {
                self.stats = TripStats::begin(now_ms);
                self.sampler.reset();
                self.first_fix_ms = None;
                self.pause_started_ms = None;
                self.total_paused_ms = 0;
                self.phase = TripPhase::Active;
                log::info!("trip started at {now_ms}");
                Ok(())
            }
            phase => bail!("cannot start a trip while {phase:?}"),
        }
    }

    /// Suspend fix processing. Statistics are untouched; the pause interval
    /// is folded into the accumulator on resume or end.
    pub fn pause(&mut self, now_ms: i64) -> Result<()> {
        if self.phase != TripPhase::Active {
            bail!("cannot pause a trip while {:?}", self.phase);
        }
        self.pause_started_ms = Some(now_ms);
        self.phase = TripPhase::Paused;
        log::info!("trip paused");
        Ok(())
    }

    pub fn resume(&mut self, now_ms: i64) -> Result<()> {
        if self.phase != TripPhase::Paused {
            bail!("cannot resume a trip while {:?}", self.phase);
        }
        self.fold_pause(now_ms);
        self.phase = TripPhase::Active;
        log::info!("trip resumed, {} ms paused so far", self.total_paused_ms);
        Ok(())
    }

    /// Finalize the running trip and return its statistics. The tracker
    /// stays in `Ended` (waypoints still readable for route optimization)
    /// until `reset` returns it to `Idle`.
    pub fn end(&mut self, now_ms: i64) -> Result<TripStats> {
        match self.phase {
            TripPhase::Active | TripPhase::Paused => {
                self.fold_pause(now_ms);
                self.stats.end_time_ms = Some(now_ms);
                self.phase = TripPhase::Ended;
                log::info!(
                    "trip ended: {:.2} km in {} active ms",
                    self.stats.total_distance_km,
                    self.elapsed_active_ms(now_ms)
                );
                Ok(self.stats.clone())
            }
            phase => bail!("cannot end a trip while {phase:?}"),
        }
    }

    /// Drop all trip state and return to `Idle`. GPS readiness survives.
    /// A reset while already idle is a no-op.
    pub fn reset(&mut self) {
        self.phase = TripPhase::Idle;
        self.stats = TripStats::default();
        self.sampler.reset();
        self.first_fix_ms = None;
        self.pause_started_ms = None;
        self.total_paused_ms = 0;
    }

    /// Ingest one raw fix. Ignored unless `Active`.
    pub fn on_fix(&mut self, fix: Position) {
        if self.phase != TripPhase::Active {
            return;
        }

        let prev = self.stats.positions.last().copied();
        let speed_kmh = self.current_speed_kmh(prev.as_ref(), &fix);

        self.stats.positions.push(fix);
        self.stats.current_speed_kmh = speed_kmh;
        self.stats.max_speed_kmh = self.stats.max_speed_kmh.max(speed_kmh);

        self.stats.elevation_m = fix.altitude_m.unwrap_or(0.0);
        if let Some(altitude) = fix.altitude_m {
            let min = self.stats.min_elevation_m.map_or(altitude, |m| m.min(altitude));
            let max = self.stats.max_elevation_m.map_or(altitude, |m| m.max(altitude));
            self.stats.min_elevation_m = Some(min);
            self.stats.max_elevation_m = Some(max);
            self.stats.elevation_gain_m = max - min;
        }

        if let Some(prev) = prev {
            let leg_km = geo::distance_km(prev.lat, prev.lng, fix.lat, fix.lng);
            if leg_km.is_finite() {
                self.stats.total_distance_km += leg_km;
            }
        }

        // Active time on the source's clock: since the first fix, minus
        // accumulated pauses (pause durations are clock-independent).
        let first_fix_ms = *self.first_fix_ms.get_or_insert(fix.timestamp_ms);
        let active_ms = (fix.timestamp_ms - first_fix_ms - self.total_paused_ms).max(0);
        let active_hours = active_ms as f64 / MS_PER_HOUR;
        self.stats.avg_speed_kmh = if active_hours > 0.0 {
            self.stats.total_distance_km / active_hours
        } else {
            0.0
        };

        self.sampler.observe(prev.as_ref(), &fix, speed_kmh);
    }

    /// React to a location failure. Permission loss aborts the trip and
    /// revokes readiness; transient failures only get logged.
    pub fn on_location_error(&mut self, error: LocationError) {
        if error.is_fatal() {
            log::error!("{error}; aborting trip");
            self.reset();
            self.gps_ready = false;
        } else {
            log::warn!("{error}; continuing to wait for fixes");
        }
    }

    fn fold_pause(&mut self, now_ms: i64) {
        if let Some(paused_at) = self.pause_started_ms.take() {
            self.total_paused_ms += (now_ms - paused_at).max(0);
        }
    }

    /// Current speed in km/h: reported speed when present (clamped at 0 to
    /// swallow small negative GPS noise), otherwise derived from the
    /// distance and time delta to the previous logged position.
    fn current_speed_kmh(&self, prev: Option<&Position>, fix: &Position) -> f64 {
        if let Some(speed_mps) = fix.speed_mps {
            let kmh = speed_mps * 3.6;
            return if kmh.is_finite() { kmh.max(0.0) } else { 0.0 };
        }
        let Some(prev) = prev else {
            return 0.0;
        };
        let dt_hours = (fix.timestamp_ms - prev.timestamp_ms) as f64 / MS_PER_HOUR;
        if dt_hours <= 0.0 {
            return 0.0;
        }
        let kmh = geo::distance_km(prev.lat, prev.lng, fix.lat, fix.lng) / dt_hours;
        if kmh.is_finite() {
            kmh
        } else {
            0.0
        }
    }
}

impl Default for TripTracker {
    fn default() -> Self {
        Self::new()
    }
}
