//! Trip scheduling and planning handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use chrono::NaiveDate;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::hos::{schedule_with_rules, HosRules, ScheduleInput};
use crate::services::trip_planner::{PlanError, TripPlanner};
use crate::types::{
    codes, ErrorResponse, Request, ScheduleRequest, SuccessResponse, TripPlanRequest,
};
use crate::validation::{validate_schedule_request, ValidationErrors};

// ==========================================================================
// Error mapping
// ==========================================================================

fn invalid(request_id: Uuid, errors: &ValidationErrors) -> ErrorResponse {
    let fields: Vec<&str> = errors.fields().collect();
    warn!("Request {} rejected, invalid fields: {}", request_id, fields.join(", "));
    let response = ErrorResponse::new(request_id, codes::INVALID_REQUEST, errors.to_string());
    match serde_json::to_value(errors) {
        Ok(details) => response.with_details(details),
        Err(_) => response,
    }
}

fn schedule_error(request_id: Uuid, err: &ScheduleError) -> ErrorResponse {
    let code = match err {
        ScheduleError::InvalidInput { .. } | ScheduleError::InvalidRules(_) => codes::INVALID_REQUEST,
        ScheduleError::DidNotConverge { .. } => codes::SCHEDULE_FAILED,
    };
    ErrorResponse::new(request_id, code, err.to_string())
}

fn plan_error(request_id: Uuid, err: &PlanError) -> ErrorResponse {
    match err {
        PlanError::Invalid(errors) => invalid(request_id, errors),
        PlanError::LocationNotFound(_) => {
            ErrorResponse::new(request_id, codes::LOCATION_NOT_FOUND, err.to_string())
        }
        PlanError::Schedule(inner) => schedule_error(request_id, inner),
        PlanError::Geocoding(_) | PlanError::Routing(_) => {
            ErrorResponse::new(request_id, codes::INTERNAL_ERROR, err.to_string())
        }
    }
}

/// Parse a request envelope, or the error reply for a malformed one
fn parse<T: DeserializeOwned>(payload: &[u8], subject: &str) -> Result<Request<T>, ErrorResponse> {
    serde_json::from_slice(payload).map_err(|e| {
        warn!("Failed to parse {} request: {}", subject, e);
        ErrorResponse::new(
            Uuid::nil(),
            codes::INVALID_REQUEST,
            format!("Failed to parse request: {}", e),
        )
    })
}

// ==========================================================================
// Reply builders
// ==========================================================================

/// Reply for one `hos.trip.schedule` payload
pub fn respond_schedule(payload: &[u8], rules: &HosRules, today: NaiveDate) -> Result<Vec<u8>> {
    let request: Request<ScheduleRequest> = match parse(payload, "schedule") {
        Ok(req) => req,
        Err(error) => return Ok(serde_json::to_vec(&error)?),
    };
    let body = &request.payload;

    if let Err(errors) = validate_schedule_request(body) {
        return Ok(serde_json::to_vec(&invalid(request.id, &errors))?);
    }

    let input = ScheduleInput {
        total_distance_km: body.total_distance_km,
        pickup_distance_km: body.pickup_distance_km,
        cycle_used_hours: body.cycle_used_hours,
        start_date: body.start_date.unwrap_or(today),
    };

    let bytes = match schedule_with_rules(&input, rules) {
        Ok(result) => {
            debug!(
                "Scheduled {} km over {} days",
                input.total_distance_km,
                result.days.len()
            );
            serde_json::to_vec(&SuccessResponse::new(request.id, result))?
        }
        Err(e) => {
            error!("Schedule request {} failed: {}", request.id, e);
            serde_json::to_vec(&schedule_error(request.id, &e))?
        }
    };
    Ok(bytes)
}

/// Reply for one `hos.trip.plan` payload
pub async fn respond_plan(payload: &[u8], planner: &TripPlanner) -> Result<Vec<u8>> {
    let request: Request<TripPlanRequest> = match parse(payload, "plan") {
        Ok(req) => req,
        Err(error) => return Ok(serde_json::to_vec(&error)?),
    };

    let bytes = match planner.plan(&request.payload).await {
        Ok(plan) => serde_json::to_vec(&SuccessResponse::new(request.id, plan))?,
        Err(e) => {
            error!("Plan request {} failed: {}", request.id, e);
            serde_json::to_vec(&plan_error(request.id, &e))?
        }
    };
    Ok(bytes)
}

// ==========================================================================
// NATS handlers
// ==========================================================================

/// Handle hos.trip.schedule requests
pub async fn handle_schedule(
    client: Client,
    mut subscriber: Subscriber,
    rules: Arc<HosRules>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let today = chrono::Local::now().date_naive();
        let response = respond_schedule(&msg.payload, &rules, today)?;
        let _ = client.publish(reply, response.into()).await;
    }

    Ok(())
}

/// Handle hos.trip.plan requests
pub async fn handle_plan(
    client: Client,
    mut subscriber: Subscriber,
    planner: Arc<TripPlanner>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        // Geocoding and routing may be slow, keep the subscription draining
        let client = client.clone();
        let planner = Arc::clone(&planner);
        tokio::spawn(async move {
            match respond_plan(&msg.payload, &planner).await {
                Ok(response) => {
                    let _ = client.publish(reply, response.into()).await;
                }
                Err(e) => error!("Failed to encode plan response: {}", e),
            }
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::CityTableGeocoder;
    use crate::services::routing::EstimatedRoutingService;
    use serde_json::{json, Value};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 22).unwrap()
    }

    fn envelope(payload: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "7f1b2c3d-0000-4000-8000-000000000001",
            "timestamp": "2026-02-22T06:00:00Z",
            "payload": payload,
        }))
        .unwrap()
    }

    fn schedule(payload: Value, rules: &HosRules) -> Value {
        let bytes = respond_schedule(&envelope(payload), rules, today()).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn planner() -> TripPlanner {
        TripPlanner::new(
            Box::new(CityTableGeocoder::new()),
            Box::new(EstimatedRoutingService::new()),
        )
    }

    async fn plan(payload: Value) -> Value {
        let bytes = respond_plan(&envelope(payload), &planner()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn schedule_replies_with_trip_result() {
        let reply = schedule(
            json!({"total_distance_km": 300.0, "pickup_distance_km": 100.0, "cycle_used_hours": 0.0}),
            &HosRules::default(),
        );

        assert_eq!(reply["id"], "7f1b2c3d-0000-4000-8000-000000000001");
        let days = reply["payload"]["days"].as_array().unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0]["date"], "2026-02-22");
        assert_eq!(days[0]["events"][0]["type"], "off_duty");
        assert_eq!(reply["payload"]["summary"]["total_days"], 1);
    }

    #[test]
    fn schedule_honours_requested_start_date() {
        let reply = schedule(
            json!({
                "total_distance_km": 50.0,
                "pickup_distance_km": 0.0,
                "cycle_used_hours": 0.0,
                "start_date": "2026-03-01"
            }),
            &HosRules::default(),
        );
        assert_eq!(reply["payload"]["days"][0]["date"], "2026-03-01");
    }

    #[test]
    fn schedule_validation_errors_carry_details() {
        let reply = schedule(
            json!({"total_distance_km": -5.0, "pickup_distance_km": 0.0, "cycle_used_hours": 90.0}),
            &HosRules::default(),
        );

        assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
        let details = reply["error"]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], "total_distance_km");
        assert_eq!(details[1]["field"], "cycle_used_hours");
    }

    #[test]
    fn schedule_day_cap_maps_to_schedule_failed() {
        let rules = HosRules {
            max_days: 1,
            ..HosRules::default()
        };
        let reply = schedule(
            json!({"total_distance_km": 3000.0, "pickup_distance_km": 0.0, "cycle_used_hours": 0.0}),
            &rules,
        );
        assert_eq!(reply["error"]["code"], "SCHEDULE_FAILED");
    }

    #[test]
    fn malformed_envelope_is_invalid_request_with_nil_id() {
        let bytes = respond_schedule(b"{\"payload\": 1}", &HosRules::default(), today()).unwrap();
        let reply: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
        assert_eq!(reply["id"], Uuid::nil().to_string());
    }

    #[tokio::test]
    async fn plan_replies_with_trip_plan() {
        let reply = plan(json!({
            "current_location": "Pune",
            "pickup_location": "Pune",
            "dropoff_location": "Mumbai",
            "current_cycle_used": 0.0,
            "start_date": "2026-02-22"
        }))
        .await;

        assert_eq!(reply["payload"]["routing_source"], "estimate");
        assert_eq!(reply["payload"]["pickup_location"]["name"], "Pune");
        assert_eq!(reply["payload"]["stops"][0]["stop_type"], "pickup");
        assert_eq!(reply["payload"]["days"][0]["date"], "2026-02-22");
    }

    #[tokio::test]
    async fn plan_unknown_city_is_location_not_found() {
        let reply = plan(json!({
            "current_location": "Pune",
            "pickup_location": "Gotham",
            "dropoff_location": "Mumbai",
            "current_cycle_used": 0.0
        }))
        .await;

        assert_eq!(reply["error"]["code"], "LOCATION_NOT_FOUND");
        assert!(reply["error"]["message"].as_str().unwrap().contains("Gotham"));
    }

    #[tokio::test]
    async fn plan_invalid_request_lists_fields() {
        let reply = plan(json!({
            "current_location": " ",
            "pickup_location": "Pune",
            "dropoff_location": "Mumbai",
            "current_cycle_used": -1.0
        }))
        .await;

        assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
        assert_eq!(reply["error"]["details"][0]["field"], "current_location");
        assert_eq!(reply["error"]["details"][1]["field"], "current_cycle_used");
    }
}
