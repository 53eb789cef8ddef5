use anyhow::{bail, Result};

use crate::models::{LatLng, RoutePoint};
use crate::services::geo;

/// A road-network routing collaborator: given ordered coordinates, returns a
/// best-effort polyline. An empty polyline means no route was found.
pub trait RoutingService {
    fn route(
        &self,
        coords: &[LatLng],
    ) -> impl std::future::Future<Output = Result<Vec<LatLng>>> + Send;
}

/// Deviation below which a candidate polyline is accepted (km).
const ACCEPT_DEVIATION_KM: f64 = 0.05;
/// Hard bound on refinement iterations.
const MAX_ITERATIONS: usize = 5;

/// Post-trip route refinement.
///
/// Matches sampled waypoints against the routing service and iteratively
/// splits the waypoint sequence at the point of maximum deviation, splicing
/// the per-half routes back together. Requests run strictly sequentially so
/// the deviation search always sees a single evolving candidate. Any
/// request failure keeps the best candidate obtained so far.
pub struct RouteOptimizer;

impl RouteOptimizer {
    pub fn new() -> Self {
        Self
    }

    pub async fn optimize<R: RoutingService>(
        &self,
        router: &R,
        points: &[RoutePoint],
    ) -> Result<Vec<LatLng>> {
        if points.len() < 2 {
            bail!("route optimization needs at least two waypoints");
        }
        let coords: Vec<LatLng> = points.iter().map(|p| LatLng::new(p.lat, p.lng)).collect();

        let mut candidate = router.route(&coords).await?;
        if candidate.is_empty() {
            bail!("routing service returned no route");
        }

        for iteration in 0..MAX_ITERATIONS {
            let Some((split_index, deviation_km)) = max_deviation(points, &candidate) else {
                break;
            };
            if deviation_km < ACCEPT_DEVIATION_KM {
                log::debug!(
                    "route accepted after {} iteration(s), max deviation {:.3} km",
                    iteration + 1,
                    deviation_km
                );
                break;
            }
            // The split point ends the first half and starts the second; an
            // extreme index leaves nothing to split.
            if split_index == 0 || split_index == coords.len() - 1 {
                break;
            }

            let first = router.route(&coords[..=split_index]).await;
            let second = router.route(&coords[split_index..]).await;
            match (first, second) {
                (Ok(first), Ok(second)) if !first.is_empty() && !second.is_empty() => {
                    candidate = splice(first, second);
                }
                _ => {
                    log::warn!(
                        "half-route request failed at iteration {}, keeping candidate",
                        iteration + 1
                    );
                    break;
                }
            }
        }

        Ok(candidate)
    }
}

impl Default for RouteOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Index and distance of the waypoint farthest from the candidate polyline,
/// where each waypoint's deviation is its distance to the *nearest*
/// candidate vertex.
fn max_deviation(points: &[RoutePoint], candidate: &[LatLng]) -> Option<(usize, f64)> {
    let mut worst: Option<(usize, f64)> = None;
    for (index, point) in points.iter().enumerate() {
        let nearest = candidate
            .iter()
            .map(|v| geo::distance_km(point.lat, point.lng, v.lat, v.lng))
            .fold(f64::INFINITY, f64::min);
        if nearest.is_finite() && worst.map_or(true, |(_, d)| nearest > d) {
            worst = Some((index, nearest));
        }
    }
    worst
}

/// Join two half-routes, dropping the duplicated junction vertex.
fn splice(mut first: Vec<LatLng>, second: Vec<LatLng>) -> Vec<LatLng> {
    first.extend(second.into_iter().skip(1));
    first
}
