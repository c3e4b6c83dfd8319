//! Error types for the duty scheduler

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid input {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("invalid rules profile: {0}")]
    InvalidRules(String),

    /// The constraint system needed more day records than the safety cap allows.
    #[error("schedule did not converge within {days} days")]
    DidNotConverge { days: usize },
}

impl ScheduleError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
