//! GPS trip tracking: fix ingestion, live statistics, adaptive route
//! sampling, road-snapped route optimization, and a SQLite trip archive.

pub mod commands;
pub mod models;
pub mod services;

pub use commands::AppState;
pub use models::{LatLng, Position, RoutePoint, SampleReason, Trip, TripPhase, TripStats};
pub use services::{
    Database, Geocoder, LocationError, LocationEvent, LocationSource, NominatimGeocoder,
    OsrmRouter, RouteOptimizer, RouteSampler, RoutingService, TripTracker,
};
