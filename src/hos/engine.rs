//! Hours-of-service duty scheduler.
//!
//! Turns trip distances and the driver's cycle state into a day-by-day duty
//! log. The simulation is a greedy walk over calendar days: each day either
//! belongs to a mandatory restart or opens one shift, drives as far as the
//! tightest limit allows, and fills the rest of the day with off-duty rest.
//!
//! Inside a shift, events are considered in a fixed priority order on every
//! pass of the inner loop:
//!
//! 1. pickup (once the pickup leg has been driven)
//! 2. the mandatory break after cumulative driving
//! 3. a fuel stop falling inside the next driving segment
//! 4. reaching the pickup point inside the next driving segment
//! 5. a plain driving segment
//!
//! Dropoff and the closing off-duty period follow once the inner loop ends.
//! The scheduler is pure: no I/O, no clock, no shared state.

use chrono::NaiveDate;

use super::{ClockTime, HosRules};
use crate::error::ScheduleError;
use crate::types::{DayLog, DutyEvent, DutyKind, TripResult, TripSummary};

/// Tolerance for comparing accumulated floating-point hours.
const EPSILON: f64 = 1e-9;

/// Partial drives at or below this are not logged; the point counts as reached.
const NEGLIGIBLE_DRIVE_HOURS: f64 = 0.01;

/// Input for the duty scheduler.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    /// Whole trip distance including the pickup leg (km).
    pub total_distance_km: f64,
    /// Distance from the start to the pickup point (km).
    pub pickup_distance_km: f64,
    /// Hours already used in the rolling cycle.
    pub cycle_used_hours: f64,
    pub start_date: NaiveDate,
}

/// Schedule a trip with the default 70-hour/8-day profile.
pub fn schedule(
    total_distance_km: f64,
    pickup_distance_km: f64,
    cycle_used_hours: f64,
    start_date: NaiveDate,
) -> Result<TripResult, ScheduleError> {
    let input = ScheduleInput {
        total_distance_km,
        pickup_distance_km,
        cycle_used_hours,
        start_date,
    };
    schedule_with_rules(&input, &HosRules::default())
}

/// Schedule a trip under an explicit regulatory profile.
///
/// Either the complete log is returned or an error; a run that hits the
/// day cap never yields a truncated schedule.
pub fn schedule_with_rules(
    input: &ScheduleInput,
    rules: &HosRules,
) -> Result<TripResult, ScheduleError> {
    rules.validate()?;
    validate_input(input, rules)?;

    let mut sim = Simulation::new(input, rules);
    while !sim.is_complete() {
        if sim.needs_restart() {
            sim.restart_phase()?;
            continue;
        }

        let mut shift = sim.open_shift();
        sim.drive_shift(&mut shift);
        sim.finish_trip_duties(&mut shift);
        sim.close_day(shift)?;
    }

    Ok(sim.into_result(input))
}

fn validate_input(input: &ScheduleInput, rules: &HosRules) -> Result<(), ScheduleError> {
    let distances = [
        ("total_distance_km", input.total_distance_km),
        ("pickup_distance_km", input.pickup_distance_km),
    ];
    for (field, value) in distances {
        if !value.is_finite() || value < 0.0 {
            return Err(ScheduleError::invalid_input(
                field,
                format!("must be a finite distance >= 0, got {}", value),
            ));
        }
    }

    let used = input.cycle_used_hours;
    if !used.is_finite() || !(0.0..=rules.cycle_limit).contains(&used) {
        return Err(ScheduleError::invalid_input(
            "cycle_used_hours",
            format!("must be within [0, {}], got {}", rules.cycle_limit, used),
        ));
    }

    Ok(())
}

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Shift
// ---------------------------------------------------------------------------

/// Per-day counters and the events logged so far.
#[derive(Debug)]
struct Shift {
    /// Hours since midnight.
    clock: f64,
    driving: f64,
    /// Everything inside the duty window: driving, duties, fuel and breaks.
    on_duty: f64,
    driving_since_break: f64,
    events: Vec<DutyEvent>,
}

impl Shift {
    fn new() -> Self {
        Self {
            clock: 0.0,
            driving: 0.0,
            on_duty: 0.0,
            driving_since_break: 0.0,
            events: Vec::new(),
        }
    }

    fn log(&mut self, kind: DutyKind, hours: f64, description: impl Into<String>) {
        let start = self.clock;
        self.clock += hours;
        self.events.push(DutyEvent {
            kind,
            start: ClockTime::from_hours(start),
            end: ClockTime::from_hours(self.clock),
            description: description.into(),
        });
    }

    /// Off-duty rest from the current clock to midnight.
    fn rest_until_midnight(&mut self) {
        let start = ClockTime::from_hours(self.clock);
        if start < ClockTime::END_OF_DAY {
            self.events.push(DutyEvent {
                kind: DutyKind::OffDuty,
                start,
                end: ClockTime::END_OF_DAY,
                description: "Off duty (rest)".to_string(),
            });
        }
        self.clock = 24.0;
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

enum Interruption {
    FuelStop { distance_km: f64, hours_until: f64 },
    PickupPoint { hours_until: f64 },
}

struct Simulation<'a> {
    rules: &'a HosRules,
    total_distance_km: f64,
    remaining_driving: f64,
    cycle_remaining: f64,
    driven_from_start: f64,
    pickup_leg_remaining: f64,
    pickup_done: bool,
    dropoff_done: bool,
    /// Fuel points fire in order; this counts those already fired.
    fuel_stops_fired: u32,
    date: NaiveDate,
    days: Vec<DayLog>,
}

impl<'a> Simulation<'a> {
    fn new(input: &ScheduleInput, rules: &'a HosRules) -> Self {
        Self {
            rules,
            total_distance_km: input.total_distance_km,
            remaining_driving: rules.driving_hours(input.total_distance_km),
            cycle_remaining: rules.cycle_limit - input.cycle_used_hours,
            driven_from_start: 0.0,
            pickup_leg_remaining: rules.driving_hours(input.pickup_distance_km),
            pickup_done: false,
            dropoff_done: false,
            fuel_stops_fired: 0,
            date: input.start_date,
            days: Vec::new(),
        }
    }

    fn is_complete(&self) -> bool {
        self.remaining_driving <= EPSILON && self.dropoff_done
    }

    fn pickup_event_pending(&self) -> bool {
        !self.pickup_done && self.pickup_leg_remaining <= EPSILON
    }

    /// On-duty time the next non-driving duty will need, if one is due.
    fn next_duty_hours(&self) -> Option<f64> {
        if self.pickup_event_pending() {
            Some(self.rules.pickup_duration)
        } else if self.remaining_driving <= EPSILON && !self.dropoff_done {
            Some(self.rules.dropoff_duration)
        } else {
            None
        }
    }

    /// A restart is due when the cycle is spent, or when the next duty cannot
    /// fit what is left of it (otherwise the day would make no progress).
    fn needs_restart(&self) -> bool {
        self.cycle_remaining <= EPSILON
            || self
                .next_duty_hours()
                .is_some_and(|hours| !self.fits_cycle(hours))
    }

    fn fits_cycle(&self, hours: f64) -> bool {
        self.cycle_remaining + EPSILON >= hours
    }

    fn fits_window(&self, shift: &Shift, hours: f64) -> bool {
        shift.on_duty + hours <= self.rules.max_on_duty_window + EPSILON
    }

    /// Next unfired fuel point as (distance km, driving hours from start).
    fn next_fuel_point(&self) -> Option<(f64, f64)> {
        let distance_km = (self.fuel_stops_fired as f64 + 1.0) * self.rules.fuel_interval_km;
        (distance_km < self.total_distance_km)
            .then(|| (distance_km, self.rules.driving_hours(distance_km)))
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// Emit whole off-duty days covering the restart, then refill the cycle.
    fn restart_phase(&mut self) -> Result<(), ScheduleError> {
        let label = format!("{}-hour restart (mandatory)", self.rules.restart_duration);
        let mut hours_left = self.rules.restart_duration;

        while hours_left > EPSILON {
            let hours_today = hours_left.min(24.0);
            hours_left -= hours_today;

            let restart_end = if hours_today >= 24.0 {
                ClockTime::END_OF_DAY
            } else {
                ClockTime::from_hours(hours_today)
            };
            let mut events = vec![DutyEvent {
                kind: DutyKind::OffDuty,
                start: ClockTime::MIDNIGHT,
                end: restart_end,
                description: label.clone(),
            }];
            if restart_end < ClockTime::END_OF_DAY {
                events.push(DutyEvent {
                    kind: DutyKind::OffDuty,
                    start: restart_end,
                    end: ClockTime::END_OF_DAY,
                    description: "Off duty".to_string(),
                });
            }

            let cycle_after = if hours_left > EPSILON {
                0.0
            } else {
                self.rules.cycle_limit
            };
            self.push_day(events, 0.0, 0.0, cycle_after)?;
        }

        self.cycle_remaining = self.rules.cycle_limit;
        Ok(())
    }

    fn open_shift(&self) -> Shift {
        let mut shift = Shift::new();
        if self.rules.shift_start_hour > 0.0 {
            shift.log(DutyKind::OffDuty, self.rules.shift_start_hour, "Off duty (rest)");
        }
        shift
    }

    /// Inner loop: keep driving until a limit ends the shift or the trip is driven.
    fn drive_shift(&mut self, shift: &mut Shift) {
        let rules = self.rules;

        while self.remaining_driving > EPSILON
            && shift.driving < rules.max_driving_per_shift - EPSILON
            && shift.on_duty < rules.max_on_duty_window - EPSILON
            && self.cycle_remaining > EPSILON
        {
            if self.pickup_event_pending() && !self.try_pickup(shift) {
                return;
            }

            if shift.driving_since_break >= rules.break_after_driving - EPSILON {
                if !self.fits_window(shift, rules.break_duration) {
                    return;
                }
                self.take_break(shift);
            }

            let segment = self.segment_budget(shift);
            if segment <= EPSILON {
                return;
            }

            match self.next_interruption(segment) {
                Some(Interruption::FuelStop {
                    distance_km,
                    hours_until,
                }) => {
                    if hours_until > NEGLIGIBLE_DRIVE_HOURS {
                        self.drive(shift, hours_until, "Driving");
                    }
                    // An armed point left unfired here fires first thing next shift.
                    if !self.fits_window(shift, rules.fuel_stop_duration) {
                        return;
                    }
                    self.refuel(shift, distance_km);
                }
                Some(Interruption::PickupPoint { hours_until }) => {
                    if hours_until > NEGLIGIBLE_DRIVE_HOURS {
                        self.drive(shift, hours_until, "Driving to pickup");
                    }
                    self.pickup_leg_remaining = 0.0;
                }
                None => self.drive(shift, segment, "Driving"),
            }
        }
    }

    /// Pickup (when the drive ended exactly at it) and dropoff once all
    /// driving is done. Either may be deferred to a later day.
    fn finish_trip_duties(&mut self, shift: &mut Shift) {
        if self.remaining_driving > EPSILON {
            return;
        }
        if self.pickup_event_pending() && !self.try_pickup(shift) {
            return;
        }
        if self.dropoff_done {
            return;
        }

        let hours = self.rules.dropoff_duration;
        if self.fits_window(shift, hours) && self.fits_cycle(hours) {
            self.perform_duty(shift, hours, "Dropoff: unloading (on duty, not driving)");
            self.dropoff_done = true;
        }
    }

    fn close_day(&mut self, mut shift: Shift) -> Result<(), ScheduleError> {
        shift.rest_until_midnight();
        let cycle = self.cycle_remaining;
        self.push_day(shift.events, shift.driving, shift.on_duty, cycle)
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Largest driving block every limit still allows.
    fn segment_budget(&self, shift: &Shift) -> f64 {
        let rules = self.rules;
        [
            self.remaining_driving,
            rules.max_driving_per_shift - shift.driving,
            rules.max_on_duty_window - shift.on_duty,
            self.cycle_remaining,
            rules.break_after_driving - shift.driving_since_break,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }

    /// The nearer of the next fuel point and the pickup point, if either lies
    /// within `segment`. Fuel wins a tie.
    fn next_interruption(&self, segment: f64) -> Option<Interruption> {
        let fuel = self.next_fuel_point().and_then(|(distance_km, at_hours)| {
            let hours_until = (at_hours - self.driven_from_start).max(0.0);
            (hours_until <= segment + EPSILON).then(|| (distance_km, hours_until.min(segment)))
        });

        let pickup = (!self.pickup_done
            && self.pickup_leg_remaining > EPSILON
            && self.pickup_leg_remaining <= segment + EPSILON)
            .then(|| self.pickup_leg_remaining.min(segment));

        match (fuel, pickup) {
            (Some((_, fuel_hours)), Some(pickup_hours)) if pickup_hours < fuel_hours - EPSILON => {
                Some(Interruption::PickupPoint {
                    hours_until: pickup_hours,
                })
            }
            (Some((distance_km, hours_until)), _) => Some(Interruption::FuelStop {
                distance_km,
                hours_until,
            }),
            (None, Some(hours_until)) => Some(Interruption::PickupPoint { hours_until }),
            (None, None) => None,
        }
    }

    fn drive(&mut self, shift: &mut Shift, hours: f64, description: &str) {
        shift.log(DutyKind::Driving, hours, description);
        shift.driving += hours;
        shift.on_duty += hours;
        shift.driving_since_break += hours;
        self.remaining_driving = (self.remaining_driving - hours).max(0.0);
        self.cycle_remaining -= hours;
        self.driven_from_start += hours;
        if !self.pickup_done {
            self.pickup_leg_remaining = (self.pickup_leg_remaining - hours).max(0.0);
        }
    }

    fn perform_duty(&mut self, shift: &mut Shift, hours: f64, description: &str) {
        shift.log(DutyKind::OnDuty, hours, description);
        shift.on_duty += hours;
        self.cycle_remaining -= hours;
    }

    fn try_pickup(&mut self, shift: &mut Shift) -> bool {
        let hours = self.rules.pickup_duration;
        if !(self.fits_window(shift, hours) && self.fits_cycle(hours)) {
            return false;
        }
        self.perform_duty(shift, hours, "Pickup: loading (on duty, not driving)");
        self.pickup_done = true;
        true
    }

    fn take_break(&mut self, shift: &mut Shift) {
        let hours = self.rules.break_duration;
        let description = format!(
            "Mandatory {}-min break ({}h driving rule)",
            hours * 60.0,
            self.rules.break_after_driving
        );
        shift.log(DutyKind::Break, hours, description);
        shift.on_duty += hours;
        shift.driving_since_break = 0.0;
    }

    fn refuel(&mut self, shift: &mut Shift, distance_km: f64) {
        let hours = self.rules.fuel_stop_duration;
        shift.log(DutyKind::Fuel, hours, format!("Fuel stop at {:.0} km", distance_km));
        shift.on_duty += hours;
        self.cycle_remaining -= hours;
        self.fuel_stops_fired += 1;
    }

    fn push_day(
        &mut self,
        events: Vec<DutyEvent>,
        driving: f64,
        on_duty: f64,
        cycle_remaining: f64,
    ) -> Result<(), ScheduleError> {
        if self.days.len() >= self.rules.max_days {
            return Err(ScheduleError::DidNotConverge {
                days: self.rules.max_days,
            });
        }

        self.days.push(DayLog {
            date: self.date,
            events,
            total_driving_hours: round_to(driving, 2),
            total_on_duty_hours: round_to(on_duty, 2),
            cycle_hours_remaining: round_to(cycle_remaining.max(0.0), 2),
        });

        self.date = self.date.succ_opt().ok_or_else(|| {
            ScheduleError::invalid_input("start_date", "schedule runs past the last supported date")
        })?;
        Ok(())
    }

    fn into_result(self, input: &ScheduleInput) -> TripResult {
        let interval = self.rules.fuel_interval_km;
        let fuel_stops_km: Vec<f64> = (1u32..)
            .map(|k| k as f64 * interval)
            .take_while(|km| *km < self.total_distance_km)
            .collect();

        let summary = TripSummary {
            total_distance_km: round_to(input.total_distance_km, 1),
            total_driving_hours: round_to(self.rules.driving_hours(input.total_distance_km), 2),
            total_days: self.days.len(),
            cycle_used_at_start: input.cycle_used_hours,
        };

        TripResult {
            days: self.days,
            fuel_stops_km,
            summary,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
