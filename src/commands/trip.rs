use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use crate::models::{Position, Trip, TripPhase, TripStats};
use crate::services::optimizer::RoutingService;
use crate::services::{
    Database, Geocoder, LocationEvent, LocationSource, RouteOptimizer, TripTracker,
};

/// Shared application state. The tracker itself owns no timers and no
/// subscription; the host shell drives it through these entry points.
pub struct AppState {
    pub db: Mutex<Option<Database>>,
    pub tracker: Mutex<TripTracker>,
    pub fixes: Mutex<Option<mpsc::UnboundedReceiver<LocationEvent>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            db: Mutex::new(None),
            tracker: Mutex::new(TripTracker::new()),
            fixes: Mutex::new(None),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Initialize the trip archive
pub async fn init_database(state: &AppState, path: &Path) -> Result<()> {
    let db = Database::new(path).await?;
    *state.db.lock().await = Some(db);
    Ok(())
}

/// Probe the location source once; a successful fix marks GPS as ready so
/// a trip can start.
pub async fn request_location_access<S: LocationSource>(
    state: &AppState,
    source: &mut S,
) -> Result<Position> {
    match source.get_once().await {
        Ok(position) => {
            state.tracker.lock().await.set_gps_ready(true);
            Ok(position)
        }
        Err(error) => {
            if error.is_fatal() {
                state.tracker.lock().await.set_gps_ready(false);
            }
            Err(anyhow!("{error}"))
        }
    }
}

/// Start a new trip and subscribe to the location source. Subscribing
/// comes first so a subscription failure never leaves the tracker active
/// without a fix stream.
pub async fn start_trip<S: LocationSource>(state: &AppState, source: &mut S) -> Result<()> {
    let receiver = source.subscribe()?;
    if let Err(error) = state.tracker.lock().await.start(now_ms()) {
        source.unsubscribe();
        return Err(error);
    }
    *state.fixes.lock().await = Some(receiver);
    Ok(())
}

/// Pause the running trip. The subscription is dropped so no fixes are
/// delivered (or queued) while paused.
pub async fn pause_trip<S: LocationSource>(state: &AppState, source: &mut S) -> Result<()> {
    state.tracker.lock().await.pause(now_ms())?;
    source.unsubscribe();
    *state.fixes.lock().await = None;
    Ok(())
}

/// Resume a paused trip and re-subscribe.
pub async fn resume_trip<S: LocationSource>(state: &AppState, source: &mut S) -> Result<()> {
    let receiver = source.subscribe()?;
    if let Err(error) = state.tracker.lock().await.resume(now_ms()) {
        source.unsubscribe();
        return Err(error);
    }
    *state.fixes.lock().await = Some(receiver);
    Ok(())
}

/// Host-tick entry point: pump all queued location events into the
/// tracker. Returns the number of events processed. A fatal location error
/// also tears the subscription down.
pub async fn drain_location_events<S: LocationSource>(
    state: &AppState,
    source: &mut S,
) -> Result<usize> {
    let mut events = Vec::new();
    {
        let mut fixes = state.fixes.lock().await;
        if let Some(receiver) = fixes.as_mut() {
            while let Ok(event) = receiver.try_recv() {
                events.push(event);
            }
        }
    }

    let mut processed = 0;
    let mut tracker = state.tracker.lock().await;
    for event in events {
        processed += 1;
        match event {
            LocationEvent::Fix(position) => tracker.on_fix(position),
            LocationEvent::Error(error) => {
                tracker.on_location_error(error);
                if error.is_fatal() {
                    source.unsubscribe();
                    *state.fixes.lock().await = None;
                    break;
                }
            }
        }
    }
    Ok(processed)
}

/// End the running trip: unsubscribe, finalize statistics, resolve
/// start/end location labels, attach the optimized route when possible,
/// persist, and return to idle.
///
/// Geocoding and routing failures are logged and degrade the record
/// ("Unknown" labels / no route); only archive failures propagate.
pub async fn end_trip<S, R, G>(
    state: &AppState,
    source: &mut S,
    router: &R,
    geocoder: &G,
) -> Result<Trip>
where
    S: LocationSource,
    R: RoutingService,
    G: Geocoder,
{
    source.unsubscribe();
    *state.fixes.lock().await = None;

    let now = now_ms();
    let mut tracker = state.tracker.lock().await;
    let mut stats = tracker.end(now)?;
    let active_ms = tracker.elapsed_active_ms(now);

    resolve_labels(&mut stats, geocoder).await;

    let points = tracker.route_points();
    if points.len() >= 2 {
        match RouteOptimizer::new().optimize(router, points).await {
            Ok(route) => stats.route = Some(route),
            Err(error) => log::warn!("route optimization failed: {error}"),
        }
    }

    let trip = Trip::from_stats(&stats, active_ms);
    {
        let db_guard = state.db.lock().await;
        let db = db_guard
            .as_ref()
            .ok_or_else(|| anyhow!("database not initialized"))?;
        db.insert_trip(&trip).await?;
    }

    tracker.reset();
    Ok(trip)
}

/// Discard the current trip (or re-validate readiness while idle) and
/// return to a clean idle state.
pub async fn reset_trip<S: LocationSource>(state: &AppState, source: &mut S) -> Result<()> {
    source.unsubscribe();
    *state.fixes.lock().await = None;
    let mut tracker = state.tracker.lock().await;
    if tracker.phase() != TripPhase::Idle {
        tracker.reset();
    }
    Ok(())
}

async fn resolve_labels<G: Geocoder>(stats: &mut TripStats, geocoder: &G) {
    if let Some(first) = stats.positions.first().copied() {
        match geocoder.lookup(first.lat, first.lng).await {
            Ok(label) => stats.start_location = label,
            Err(error) => log::warn!("start location lookup failed: {error}"),
        }
    }
    if let Some(last) = stats.positions.last().copied() {
        match geocoder.lookup(last.lat, last.lng).await {
            Ok(label) => stats.end_location = label,
            Err(error) => log::warn!("end location lookup failed: {error}"),
        }
    }
}
