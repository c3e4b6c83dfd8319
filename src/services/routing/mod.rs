//! Routing service for trip distance, duration and geometry
//!
//! Uses OSRM when configured, straight-line estimation otherwise. With OSRM
//! configured, every request that OSRM cannot answer falls back to the
//! estimate.

mod osrm;

pub use osrm::OsrmClient;

use async_trait::async_trait;
use anyhow::Result;
use tracing::{info, warn};

use crate::hos::round_to;
use crate::services::geo::{road_distance_along, travel_time_hours};
use crate::types::Coordinates;

/// A driving route through a list of waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    /// Road distance in km, rounded to 0.1
    pub distance_km: f64,
    /// Driving time in hours, rounded to 0.01
    pub duration_hours: f64,
    /// Polyline as `[lat, lng]` pairs
    pub geometry: Vec<[f64; 2]>,
    /// Name of the service that produced this route
    pub source: &'static str,
}

/// Routing service trait for abstraction (OSRM, estimation, etc.)
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Route through the waypoints in order
    async fn route(&self, waypoints: &[Coordinates]) -> Result<RouteEstimate>;

    /// Get service name for logging
    fn name(&self) -> &'static str;
}

/// Straight-line routing estimate
/// Uses Haversine distance × road coefficient at an average truck speed
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatedRoutingService;

impl EstimatedRoutingService {
    pub const NAME: &'static str = "estimate";

    pub fn new() -> Self {
        Self
    }

    pub fn estimate(waypoints: &[Coordinates]) -> RouteEstimate {
        let distance_km = road_distance_along(waypoints);

        RouteEstimate {
            distance_km: round_to(distance_km, 1),
            duration_hours: round_to(travel_time_hours(distance_km), 2),
            geometry: waypoints.iter().map(|c| [c.lat, c.lng]).collect(),
            source: Self::NAME,
        }
    }
}

#[async_trait]
impl RoutingService for EstimatedRoutingService {
    async fn route(&self, waypoints: &[Coordinates]) -> Result<RouteEstimate> {
        Ok(Self::estimate(waypoints))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Primary routing service with a per-request fallback to the estimate
pub struct FallbackRoutingService {
    primary: Box<dyn RoutingService>,
}

impl FallbackRoutingService {
    pub fn new(primary: Box<dyn RoutingService>) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl RoutingService for FallbackRoutingService {
    async fn route(&self, waypoints: &[Coordinates]) -> Result<RouteEstimate> {
        match self.primary.route(waypoints).await {
            Ok(route) => Ok(route),
            Err(e) => {
                warn!(
                    "{} routing failed for {} waypoints: {:#}. Falling back to estimate.",
                    self.primary.name(),
                    waypoints.len(),
                    e
                );
                Ok(EstimatedRoutingService::estimate(waypoints))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Create routing service based on configuration
pub fn create_routing_service(osrm_url: Option<&str>) -> Result<Box<dyn RoutingService>> {
    match osrm_url {
        Some(url) => {
            info!("Using OSRM routing at {} with estimate fallback", url);
            Ok(Box::new(FallbackRoutingService::new(Box::new(OsrmClient::new(url)?))))
        }
        None => {
            info!("Using estimated routing (OSRM not configured)");
            Ok(Box::new(EstimatedRoutingService::new()))
        }
    }
}
