use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::models::LatLng;
use crate::services::optimizer::RoutingService;

const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

/// OSRM-compatible road-network routing client.
pub struct OsrmRouter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [lng, lat]
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRouter {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn request_url(&self, coords: &[LatLng]) -> String {
        let waypoints = coords
            .iter()
            .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/driving/{}?overview=full&geometries=geojson",
            self.base_url, waypoints
        )
    }
}

impl Default for OsrmRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingService for OsrmRouter {
    async fn route(&self, coords: &[LatLng]) -> Result<Vec<LatLng>> {
        let url = self.request_url(coords);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("routing request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("routing service error: {}", response.status()));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse routing response: {e}"))?;

        // Non-Ok or empty result means no route; the caller decides whether
        // that aborts optimization.
        if body.code != "Ok" {
            return Ok(Vec::new());
        }
        Ok(body
            .routes
            .first()
            .map(|route| {
                route
                    .geometry
                    .coordinates
                    .iter()
                    .map(|[lng, lat]| LatLng::new(*lat, *lng))
                    .collect()
            })
            .unwrap_or_default())
    }
}
