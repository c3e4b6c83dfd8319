//! Hours-of-service scheduling core

pub mod clock;
pub mod engine;
pub mod rules;

pub use clock::ClockTime;
pub use engine::{schedule, schedule_with_rules, ScheduleInput};
pub(crate) use engine::round_to;
pub use rules::HosRules;
