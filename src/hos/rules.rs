//! Regulatory profile for the duty scheduler.
//!
//! Every limit the simulation enforces lives in one immutable `HosRules`
//! value. The default is the US property-carrying 70-hour/8-day profile;
//! other jurisdictions are expressed by building a different value.

use crate::error::ScheduleError;

/// Hours-of-service limits and trip assumptions.
#[derive(Debug, Clone, PartialEq)]
pub struct HosRules {
    /// Maximum driving hours in one shift.
    pub max_driving_per_shift: f64,
    /// Maximum on-duty window of one shift (hours).
    pub max_on_duty_window: f64,
    /// Cumulative driving hours that require a break.
    pub break_after_driving: f64,
    /// Length of the mandatory break (hours).
    pub break_duration: f64,
    /// Rolling cycle budget (hours).
    pub cycle_limit: f64,
    /// Off-duty hours that reset the cycle.
    pub restart_duration: f64,
    /// Distance between fuel stops (km).
    pub fuel_interval_km: f64,
    /// Assumed average travel speed (km/h).
    pub average_speed_kmh: f64,
    /// On-duty time for loading at pickup (hours).
    pub pickup_duration: f64,
    /// On-duty time for unloading at dropoff (hours).
    pub dropoff_duration: f64,
    /// Clock hour the daily shift opens.
    pub shift_start_hour: f64,
    /// On-duty time for one fuel stop (hours).
    pub fuel_stop_duration: f64,
    /// Upper bound on generated day records before giving up.
    pub max_days: usize,
}

impl HosRules {
    /// US FMCSA property-carrying driver, 70-hour/8-day cycle.
    pub const PROPERTY_CARRYING_70_8: HosRules = HosRules {
        max_driving_per_shift: 11.0,
        max_on_duty_window: 14.0,
        break_after_driving: 8.0,
        break_duration: 0.5,
        cycle_limit: 70.0,
        restart_duration: 34.0,
        fuel_interval_km: 1600.0,
        average_speed_kmh: 60.0,
        pickup_duration: 1.0,
        dropoff_duration: 1.0,
        shift_start_hour: 6.0,
        fuel_stop_duration: 0.5,
        max_days: 30,
    };

    /// Convert a distance to driving hours at the profile's average speed.
    pub fn driving_hours(&self, distance_km: f64) -> f64 {
        distance_km / self.average_speed_kmh
    }

    /// Reject profiles the simulation cannot make progress with.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let positive = [
            ("max_driving_per_shift", self.max_driving_per_shift),
            ("max_on_duty_window", self.max_on_duty_window),
            ("break_after_driving", self.break_after_driving),
            ("cycle_limit", self.cycle_limit),
            ("restart_duration", self.restart_duration),
            ("fuel_interval_km", self.fuel_interval_km),
            ("average_speed_kmh", self.average_speed_kmh),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScheduleError::InvalidRules(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("break_duration", self.break_duration),
            ("pickup_duration", self.pickup_duration),
            ("dropoff_duration", self.dropoff_duration),
            ("fuel_stop_duration", self.fuel_stop_duration),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ScheduleError::InvalidRules(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..24.0).contains(&self.shift_start_hour) {
            return Err(ScheduleError::InvalidRules(format!(
                "shift_start_hour must be within [0, 24), got {}",
                self.shift_start_hour
            )));
        }
        if self.shift_start_hour + self.max_on_duty_window > 24.0 {
            return Err(ScheduleError::InvalidRules(
                "on-duty window must close before midnight".to_string(),
            ));
        }
        let largest_duty = self.pickup_duration.max(self.dropoff_duration);
        if largest_duty > self.max_on_duty_window || largest_duty > self.cycle_limit {
            return Err(ScheduleError::InvalidRules(
                "pickup/dropoff must fit inside an empty shift and a full cycle".to_string(),
            ));
        }
        if self.max_days == 0 {
            return Err(ScheduleError::InvalidRules("max_days must be at least 1".to_string()));
        }

        Ok(())
    }
}

impl Default for HosRules {
    fn default() -> Self {
        Self::PROPERTY_CARRYING_70_8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert!(HosRules::default().validate().is_ok());
    }

    #[test]
    fn driving_hours_uses_average_speed() {
        let rules = HosRules::default();
        assert!((rules.driving_hours(600.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_speed_is_rejected() {
        let rules = HosRules {
            average_speed_kmh: 0.0,
            ..HosRules::default()
        };
        let err = rules.validate().unwrap_err();
        assert!(err.to_string().contains("average_speed_kmh"));
    }

    #[test]
    fn window_past_midnight_is_rejected() {
        let rules = HosRules {
            shift_start_hour: 12.0,
            ..HosRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
