//! Trip and duty log types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Coordinates;
use crate::hos::ClockTime;

/// Duty status of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyKind {
    Driving,
    Break,
    OnDuty,
    OffDuty,
    Fuel,
}

/// One timed activity on a day's log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyEvent {
    #[serde(rename = "type")]
    pub kind: DutyKind,
    pub start: ClockTime,
    pub end: ClockTime,
    pub description: String,
}

/// One calendar day of the duty log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayLog {
    pub date: NaiveDate,
    pub events: Vec<DutyEvent>,
    pub total_driving_hours: f64,
    pub total_on_duty_hours: f64,
    pub cycle_hours_remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub total_distance_km: f64,
    pub total_driving_hours: f64,
    pub total_days: usize,
    pub cycle_used_at_start: f64,
}

/// Output of the duty scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub days: Vec<DayLog>,
    pub fuel_stops_km: Vec<f64>,
    pub summary: TripSummary,
}

/// Scheduler request with pre-computed distances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub total_distance_km: f64,
    pub pickup_distance_km: f64,
    pub cycle_used_hours: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Full trip planning request by place names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlanRequest {
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub current_cycle_used: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    Pickup,
    Dropoff,
    Fuel,
    Rest,
}

/// A stop placed along the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStop {
    pub stop_type: StopType,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_from_start_km: f64,
}

/// A geocoded place name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NamedLocation {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            latitude: coordinates.lat,
            longitude: coordinates.lng,
        }
    }
}

/// Result of full trip planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub current_location: NamedLocation,
    pub pickup_location: NamedLocation,
    pub dropoff_location: NamedLocation,
    /// Route polyline as `[lat, lng]` pairs
    pub route_geometry: Vec<[f64; 2]>,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    /// Name of the routing backend that produced the distances
    pub routing_source: String,
    pub stops: Vec<TripStop>,
    pub days: Vec<DayLog>,
    pub fuel_stops_km: Vec<f64>,
    pub summary: TripSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_event_serializes_with_type_key_and_clock_strings() {
        let event = DutyEvent {
            kind: DutyKind::OnDuty,
            start: ClockTime::from_hours(6.0),
            end: ClockTime::from_hours(7.0),
            description: "Pickup".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "on_duty");
        assert_eq!(json["start"], "06:00");
        assert_eq!(json["end"], "07:00");
    }

    #[test]
    fn break_kind_serializes_as_break() {
        let json = serde_json::to_string(&DutyKind::Break).unwrap();
        assert_eq!(json, "\"break\"");
    }

    #[test]
    fn day_log_date_is_iso_8601() {
        let day = DayLog {
            date: NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
            events: vec![],
            total_driving_hours: 0.0,
            total_on_duty_hours: 0.0,
            cycle_hours_remaining: 70.0,
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2026-02-22");
    }

    #[test]
    fn schedule_request_start_date_is_optional() {
        let req: ScheduleRequest = serde_json::from_str(
            r#"{"total_distance_km": 100.0, "pickup_distance_km": 10.0, "cycle_used_hours": 5.0}"#,
        )
        .unwrap();
        assert!(req.start_date.is_none());
    }
}
