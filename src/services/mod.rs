pub mod database;
pub mod geo;
pub mod geocoder;
pub mod location;
pub mod optimizer;
pub mod routing;
pub mod sampler;
pub mod tracker;

pub use database::Database;
pub use geocoder::{Geocoder, NominatimGeocoder};
pub use location::{LocationError, LocationEvent, LocationSource, ManualLocationSource};
pub use optimizer::{RouteOptimizer, RoutingService};
pub use routing::OsrmRouter;
pub use sampler::RouteSampler;
pub use tracker::TripTracker;
