//! Minute-precision clock times for duty log events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Time of day in whole minutes, `00:00` through `24:00` inclusive.
///
/// `24:00` only ever appears as the end of the last event of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

const MINUTES_PER_DAY: u16 = 24 * 60;

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    /// Convert decimal hours from midnight to a clock time.
    ///
    /// The hour is taken modulo 24 and the fractional part is rounded to the
    /// nearest minute; a rounded 60 carries into the hour.
    pub fn from_hours(hours_from_midnight: f64) -> Self {
        let whole = hours_from_midnight.trunc();
        let mut hour = (whole as i64).rem_euclid(24);
        let mut minute = ((hours_from_midnight - whole) * 60.0).round() as i64;
        if minute >= 60 {
            hour += 1;
            minute = 0;
        }
        let total = (hour * 60 + minute).clamp(0, MINUTES_PER_DAY as i64);
        ClockTime(total as u16)
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        let total = hour.checked_mul(60)?.checked_add(minute)?;
        (total <= MINUTES_PER_DAY).then_some(ClockTime(total))
    }

    #[cfg(test)]
    pub fn minutes_from_midnight(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock time '{0}', expected HH:MM between 00:00 and 24:00")]
pub struct ParseClockTimeError(String);

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseClockTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        ClockTime::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional_hours() {
        assert_eq!(ClockTime::from_hours(6.0).to_string(), "06:00");
        assert_eq!(ClockTime::from_hours(13.5).to_string(), "13:30");
        assert_eq!(ClockTime::from_hours(7.25).to_string(), "07:15");
    }

    #[test]
    fn rounds_to_nearest_minute() {
        // 10h + 0.4 min
        assert_eq!(ClockTime::from_hours(10.0 + 0.4 / 60.0).to_string(), "10:00");
        // 10h + 0.6 min
        assert_eq!(ClockTime::from_hours(10.0 + 0.6 / 60.0).to_string(), "10:01");
    }

    #[test]
    fn sixty_minutes_carry_into_the_hour() {
        assert_eq!(ClockTime::from_hours(8.9999).to_string(), "09:00");
    }

    #[test]
    fn hours_wrap_modulo_24() {
        assert_eq!(ClockTime::from_hours(24.0).to_string(), "00:00");
        assert_eq!(ClockTime::from_hours(25.5).to_string(), "01:30");
    }

    #[test]
    fn end_of_day_renders_as_24() {
        assert_eq!(ClockTime::END_OF_DAY.to_string(), "24:00");
        assert_eq!(ClockTime::MIDNIGHT.to_string(), "00:00");
    }

    #[test]
    fn parses_valid_and_rejects_invalid() {
        assert_eq!("06:30".parse::<ClockTime>().unwrap().minutes_from_midnight(), 390);
        assert_eq!("24:00".parse::<ClockTime>().unwrap(), ClockTime::END_OF_DAY);
        assert!("24:01".parse::<ClockTime>().is_err());
        assert!("6:30".parse::<ClockTime>().is_err());
        assert!("06:60".parse::<ClockTime>().is_err());
        assert!("noon".parse::<ClockTime>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&ClockTime::from_hours(17.75)).unwrap();
        assert_eq!(json, "\"17:45\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), "17:45");
    }
}
