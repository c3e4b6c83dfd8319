//! Full trip planning
//!
//! Geocodes the three named places, routes the trip and the pickup leg,
//! runs the duty scheduler and places pickup, dropoff, fuel and rest stops
//! along the route.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ScheduleError;
use crate::hos::{schedule_with_rules, HosRules, ScheduleInput};
use crate::services::geo::interpolate_point_on_route;
use crate::services::geocoding::Geocoder;
use crate::services::routing::{RouteEstimate, RoutingService};
use crate::types::{
    Coordinates, NamedLocation, StopType, TripPlan, TripPlanRequest, TripResult, TripStop,
};
use crate::validation::{validate_trip_request, ValidationErrors};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid trip request: {0}")]
    Invalid(ValidationErrors),

    #[error("could not geocode location: {0}")]
    LocationNotFound(String),

    #[error("geocoding failed: {0:#}")]
    Geocoding(anyhow::Error),

    #[error("routing failed: {0:#}")]
    Routing(anyhow::Error),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Plans trips with the configured geocoder and routing service
pub struct TripPlanner {
    geocoder: Box<dyn Geocoder>,
    router: Box<dyn RoutingService>,
    rules: HosRules,
}

impl TripPlanner {
    pub fn new(geocoder: Box<dyn Geocoder>, router: Box<dyn RoutingService>) -> Self {
        Self::with_rules(geocoder, router, HosRules::default())
    }

    pub fn with_rules(
        geocoder: Box<dyn Geocoder>,
        router: Box<dyn RoutingService>,
        rules: HosRules,
    ) -> Self {
        Self { geocoder, router, rules }
    }

    /// Plan a trip, starting today unless the request names a date
    pub async fn plan(&self, request: &TripPlanRequest) -> Result<TripPlan, PlanError> {
        let start_date = request
            .start_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        self.plan_from(request, start_date).await
    }

    pub async fn plan_from(
        &self,
        request: &TripPlanRequest,
        start_date: NaiveDate,
    ) -> Result<TripPlan, PlanError> {
        validate_trip_request(request).map_err(PlanError::Invalid)?;

        let current = self.locate(&request.current_location).await?;
        let pickup = self.locate(&request.pickup_location).await?;
        let dropoff = self.locate(&request.dropoff_location).await?;

        let route = self
            .router
            .route(&[current, pickup, dropoff])
            .await
            .map_err(PlanError::Routing)?;
        let pickup_leg = self
            .router
            .route(&[current, pickup])
            .await
            .map_err(PlanError::Routing)?;

        let total_km = route.distance_km;
        let pickup_km = pickup_leg.distance_km.min(total_km);
        debug!(
            "Routed via {}: {} km total, pickup at {} km",
            route.source, total_km, pickup_km
        );

        let result = schedule_with_rules(
            &ScheduleInput {
                total_distance_km: total_km,
                pickup_distance_km: pickup_km,
                cycle_used_hours: request.current_cycle_used,
                start_date,
            },
            &self.rules,
        )?;

        let stops = build_stops(
            &route,
            &result,
            &self.rules,
            (request.pickup_location.as_str(), pickup, pickup_km),
            (request.dropoff_location.as_str(), dropoff),
        );

        info!(
            "Planned {} -> {} -> {}: {} km, {} days, {} stops",
            request.current_location,
            request.pickup_location,
            request.dropoff_location,
            total_km,
            result.days.len(),
            stops.len()
        );

        Ok(TripPlan {
            current_location: NamedLocation::new(request.current_location.trim(), current),
            pickup_location: NamedLocation::new(request.pickup_location.trim(), pickup),
            dropoff_location: NamedLocation::new(request.dropoff_location.trim(), dropoff),
            route_geometry: route.geometry,
            total_distance_km: total_km,
            total_duration_hours: route.duration_hours,
            routing_source: route.source.to_string(),
            stops,
            days: result.days,
            fuel_stops_km: result.fuel_stops_km,
            summary: result.summary,
        })
    }

    async fn locate(&self, place: &str) -> Result<Coordinates, PlanError> {
        let found = self
            .geocoder
            .geocode(place)
            .await
            .map_err(PlanError::Geocoding)?
            .ok_or_else(|| PlanError::LocationNotFound(place.trim().to_string()))?;
        debug!(
            "Geocoded '{}' via {} to {} ({:.4},{:.4}, confidence {:.2})",
            place,
            self.geocoder.name(),
            found.display_name,
            found.coordinates.lat,
            found.coordinates.lng,
            found.confidence
        );
        Ok(found.coordinates)
    }
}

/// Stops along the route, ordered by distance from the start
fn build_stops(
    route: &RouteEstimate,
    result: &TripResult,
    rules: &HosRules,
    (pickup_name, pickup, pickup_km): (&str, Coordinates, f64),
    (dropoff_name, dropoff): (&str, Coordinates),
) -> Vec<TripStop> {
    let total_km = route.distance_km;
    let at = |km: f64| interpolate_point_on_route(&route.geometry, total_km, km);

    let mut stops = vec![
        stop(StopType::Pickup, pickup_name.trim().to_string(), pickup, pickup_km),
        stop(StopType::Dropoff, dropoff_name.trim().to_string(), dropoff, total_km),
    ];

    for &km in &result.fuel_stops_km {
        stops.push(stop(StopType::Fuel, format!("Fuel stop at {:.0} km", km), at(km), km));
    }

    // Rest at the end of every driving day except the last
    let last = result.days.len().saturating_sub(1);
    let mut cumulative_km = 0.0;
    for (i, day) in result.days.iter().enumerate() {
        cumulative_km += day.total_driving_hours * rules.average_speed_kmh;
        if i < last && day.total_driving_hours > 0.0 {
            let km = cumulative_km.min(total_km);
            stops.push(stop(StopType::Rest, format!("Rest stop (Day {})", i + 1), at(km), km));
        }
    }

    stops.sort_by(|a, b| a.distance_from_start_km.total_cmp(&b.distance_from_start_km));
    stops
}

fn stop(stop_type: StopType, name: String, point: Coordinates, km: f64) -> TripStop {
    TripStop {
        stop_type,
        name,
        latitude: point.lat,
        longitude: point.lng,
        distance_from_start_km: km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::{CityTableGeocoder, GeocodingResult, MockGeocoder};
    use crate::services::routing::EstimatedRoutingService;
    use anyhow::Result;
    use async_trait::async_trait;

    struct BrokenGeocoder;

    #[async_trait]
    impl Geocoder for BrokenGeocoder {
        async fn geocode(&self, _place: &str) -> Result<Option<GeocodingResult>> {
            anyhow::bail!("upstream timeout")
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn planner() -> TripPlanner {
        TripPlanner::new(
            Box::new(CityTableGeocoder::new()),
            Box::new(EstimatedRoutingService::new()),
        )
    }

    fn request(current: &str, pickup: &str, dropoff: &str, cycle: f64) -> TripPlanRequest {
        TripPlanRequest {
            current_location: current.to_string(),
            pickup_location: pickup.to_string(),
            dropoff_location: dropoff.to_string(),
            current_cycle_used: cycle,
            start_date: None,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 22).unwrap()
    }

    #[tokio::test]
    async fn plans_multi_day_trip_with_sorted_stops() {
        let plan = planner()
            .plan_from(&request("Bengaluru", "Chennai", "Mumbai", 40.0), start())
            .await
            .unwrap();

        assert_eq!(plan.routing_source, "estimate");
        assert!(plan.total_distance_km > 1500.0);
        assert_eq!(plan.summary.total_distance_km, plan.total_distance_km);
        assert!(plan.days.len() > 1);
        assert_eq!(plan.days[0].date, start());

        let distances: Vec<f64> = plan.stops.iter().map(|s| s.distance_from_start_km).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]), "stops not sorted: {:?}", distances);

        let pickup = plan.stops.iter().find(|s| s.stop_type == StopType::Pickup).unwrap();
        assert_eq!(pickup.name, "Chennai");
        assert_eq!(pickup.latitude, 13.0827);

        let dropoff = plan.stops.iter().find(|s| s.stop_type == StopType::Dropoff).unwrap();
        assert_eq!(dropoff.distance_from_start_km, plan.total_distance_km);
        assert_eq!(dropoff.longitude, 72.8777);
    }

    #[tokio::test]
    async fn fuel_stops_match_schedule() {
        let plan = planner()
            .plan_from(&request("Bengaluru", "Chennai", "Mumbai", 0.0), start())
            .await
            .unwrap();

        let fuel: Vec<&TripStop> = plan
            .stops
            .iter()
            .filter(|s| s.stop_type == StopType::Fuel)
            .collect();
        assert_eq!(fuel.len(), plan.fuel_stops_km.len());
        assert_eq!(fuel[0].name, "Fuel stop at 1600 km");
        assert_eq!(fuel[0].distance_from_start_km, 1600.0);
    }

    #[tokio::test]
    async fn rest_stops_close_every_driving_day_but_the_last() {
        let plan = planner()
            .plan_from(&request("Bengaluru", "Chennai", "Mumbai", 0.0), start())
            .await
            .unwrap();

        let last = plan.days.len() - 1;
        let expected = plan.days[..last]
            .iter()
            .filter(|d| d.total_driving_hours > 0.0)
            .count();
        let rests: Vec<&TripStop> = plan
            .stops
            .iter()
            .filter(|s| s.stop_type == StopType::Rest)
            .collect();

        assert_eq!(rests.len(), expected);
        assert_eq!(rests[0].name, "Rest stop (Day 1)");
        assert!(rests.iter().all(|s| s.distance_from_start_km <= plan.total_distance_km));
    }

    #[tokio::test]
    async fn same_start_and_pickup_puts_pickup_at_zero() {
        let plan = planner()
            .plan_from(&request("Pune", "Pune", "Mumbai", 0.0), start())
            .await
            .unwrap();

        assert_eq!(plan.stops[0].stop_type, StopType::Pickup);
        assert_eq!(plan.stops[0].distance_from_start_km, 0.0);
        assert_eq!(plan.days.len(), 1);
    }

    #[tokio::test]
    async fn unknown_city_is_location_not_found() {
        let err = planner()
            .plan_from(&request("Bengaluru", "Atlantis", "Mumbai", 0.0), start())
            .await
            .unwrap_err();

        assert!(matches!(err, PlanError::LocationNotFound(ref name) if name == "Atlantis"));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_geocoding() {
        let planner = TripPlanner::new(
            Box::new(BrokenGeocoder),
            Box::new(EstimatedRoutingService::new()),
        );
        let err = planner
            .plan_from(&request("", "Chennai", "Mumbai", 80.0), start())
            .await
            .unwrap_err();

        match err {
            PlanError::Invalid(errors) => assert_eq!(errors.0.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn geocoder_failure_is_reported() {
        let planner = TripPlanner::new(
            Box::new(BrokenGeocoder),
            Box::new(EstimatedRoutingService::new()),
        );
        let err = planner
            .plan_from(&request("Bengaluru", "Chennai", "Mumbai", 0.0), start())
            .await
            .unwrap_err();

        assert!(matches!(err, PlanError::Geocoding(_)));
        assert!(err.to_string().contains("upstream timeout"));
    }

    #[tokio::test]
    async fn mock_geocoder_plans_any_places() {
        let planner = TripPlanner::new(
            Box::new(MockGeocoder::new()),
            Box::new(EstimatedRoutingService::new()),
        );
        let plan = planner
            .plan_from(&request("Hubli", "Belgaum", "Solapur", 10.0), start())
            .await
            .unwrap();

        assert_eq!(plan.current_location.name, "Hubli");
        assert_eq!(plan.route_geometry.len(), 3);
        assert_eq!(plan.summary.cycle_used_at_start, 10.0);
    }
}
