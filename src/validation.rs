//! Request validation.
//!
//! Checks incoming trip and schedule requests before any geocoding or
//! scheduling work starts. Every problem is collected so the caller can
//! report all of them at once.

use std::fmt;

use serde::Serialize;

use crate::types::{ScheduleRequest, TripPlanRequest};

/// Longest accepted place name.
pub const MAX_LOCATION_LEN: usize = 255;

/// Upper bound for hours already used in the cycle.
pub const MAX_CYCLE_USED_HOURS: f64 = 70.0;

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All validation failures of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn location(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be blank");
        } else if value.chars().count() > MAX_LOCATION_LEN {
            self.push(field, format!("must be at most {} characters", MAX_LOCATION_LEN));
        }
    }

    fn cycle_used(&mut self, field: &'static str, value: f64) {
        if !value.is_finite() || !(0.0..=MAX_CYCLE_USED_HOURS).contains(&value) {
            self.push(field, format!("must be between 0 and {}", MAX_CYCLE_USED_HOURS));
        }
    }

    fn distance(&mut self, field: &'static str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.push(field, "must be a distance of 0 km or more");
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Validate a trip planning request.
pub fn validate_trip_request(request: &TripPlanRequest) -> Result<(), ValidationErrors> {
    let mut errors = Collector::default();
    errors.location("current_location", &request.current_location);
    errors.location("pickup_location", &request.pickup_location);
    errors.location("dropoff_location", &request.dropoff_location);
    errors.cycle_used("current_cycle_used", request.current_cycle_used);
    errors.finish()
}

/// Validate a scheduling request with precomputed distances.
pub fn validate_schedule_request(request: &ScheduleRequest) -> Result<(), ValidationErrors> {
    let mut errors = Collector::default();
    errors.distance("total_distance_km", request.total_distance_km);
    errors.distance("pickup_distance_km", request.pickup_distance_km);
    errors.cycle_used("cycle_used_hours", request.cycle_used_hours);
    errors.finish()
}
