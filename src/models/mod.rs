mod position;
mod sample;
mod trip;

pub use position::{LatLng, Position};
pub use sample::{RoutePoint, SampleReason};
pub use trip::{format_duration, Trip, TripPhase, TripStats};
