//! OSRM routing engine client
//!
//! OSRM API documentation:
//! https://project-osrm.org/docs/v5.24.0/api/#route-service

use async_trait::async_trait;
use anyhow::{Result, Context};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::types::Coordinates;
use super::{round_to, RouteEstimate, RoutingService};

/// Request timeout in seconds
const TIMEOUT_SECONDS: u64 = 15;

/// OSRM routing client
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    pub const NAME: &'static str = "osrm";

    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("hos-worker/0.1 (trip planner)")
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECONDS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Route URL; OSRM takes `lng,lat` pairs separated by semicolons
    pub fn route_url(&self, waypoints: &[Coordinates]) -> String {
        let coords: Vec<String> = waypoints
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect();
        format!(
            "{}/route/v1/driving/{}?overview=full&geometries=geojson&steps=false",
            self.base_url,
            coords.join(";")
        )
    }
}

#[async_trait]
impl RoutingService for OsrmClient {
    async fn route(&self, waypoints: &[Coordinates]) -> Result<RouteEstimate> {
        if waypoints.len() < 2 {
            anyhow::bail!("OSRM route needs at least 2 waypoints, got {}", waypoints.len());
        }

        let url = self.route_url(waypoints);
        debug!("Requesting route from OSRM for {} waypoints", waypoints.len());

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send route request to OSRM")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OSRM returned error {}: {}", status, body);
        }

        let route_response: RouteResponse = response
            .json()
            .await
            .context("Failed to parse OSRM route response")?;

        let estimate = route_response.into_estimate()?;
        debug!(
            "OSRM route: {} km, {} h, {} geometry points",
            estimate.distance_km,
            estimate.duration_hours,
            estimate.geometry.len()
        );
        Ok(estimate)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

// OSRM API types

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
    geometry: Geometry,
}

/// GeoJSON line string, coordinates in `[lng, lat]` order
#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

impl RouteResponse {
    fn into_estimate(self) -> Result<RouteEstimate> {
        if self.code != "Ok" {
            anyhow::bail!("OSRM returned code {}", self.code);
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .context("OSRM returned no routes")?;

        Ok(RouteEstimate {
            distance_km: round_to(route.distance / 1000.0, 1),
            duration_hours: round_to(route.duration / 3600.0, 2),
            geometry: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| [lat, lng])
                .collect(),
            source: OsrmClient::NAME,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url_uses_lng_lat_order() {
        let client = OsrmClient::new("http://localhost:5000/").unwrap();
        let url = client.route_url(&[
            Coordinates::new(12.9716, 77.5946),
            Coordinates::new(13.0827, 80.2707),
        ]);
        assert_eq!(
            url,
            "http://localhost:5000/route/v1/driving/77.5946,12.9716;80.2707,13.0827?overview=full&geometries=geojson&steps=false"
        );
    }

    #[test]
    fn test_response_converts_units_and_flips_coordinates() {
        let raw = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 346123.0,
                "duration": 20250.0,
                "geometry": {"type": "LineString", "coordinates": [[77.59, 12.97], [80.27, 13.08]]}
            }]
        }"#;
        let response: RouteResponse = serde_json::from_str(raw).unwrap();
        let estimate = response.into_estimate().unwrap();

        assert_eq!(estimate.distance_km, 346.1);
        assert_eq!(estimate.duration_hours, 5.63);
        assert_eq!(estimate.geometry, vec![[12.97, 77.59], [13.08, 80.27]]);
        assert_eq!(estimate.source, "osrm");
    }

    #[test]
    fn test_response_error_code_is_an_error() {
        let raw = r#"{"code": "NoRoute", "message": "Impossible route"}"#;
        let response: RouteResponse = serde_json::from_str(raw).unwrap();
        let err = response.into_estimate().unwrap_err();
        assert!(err.to_string().contains("NoRoute"));
    }

    #[test]
    fn test_response_without_routes_is_an_error() {
        let raw = r#"{"code": "Ok", "routes": []}"#;
        let response: RouteResponse = serde_json::from_str(raw).unwrap();
        assert!(response.into_estimate().is_err());
    }

    #[tokio::test]
    async fn test_route_rejects_single_waypoint() {
        let client = OsrmClient::new("http://localhost:5000").unwrap();
        assert!(client.route(&[Coordinates::new(1.0, 2.0)]).await.is_err());
    }
}
