//! Time and timestamp helpers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// UTC timestamp used for probe times, override expiry, refresh times, etc.
pub type Timestamp = DateTime<Utc>;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// A wall-clock time of day with minute resolution (`HHMM`).
///
/// Ordering follows the time of day, so `23:59 > 00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: Self = Self(0);

    /// Build a clock time from hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidClockTime`] when `hour >= 24` or
    /// `minute >= 60`.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ValidationError> {
        if hour >= 24 || minute >= 60 {
            return Err(ValidationError::InvalidClockTime {
                value: format!("{hour:02}{minute:02}"),
            });
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Build a clock time from its `HHMM` integer form, e.g. `1930`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidClockTime`] when either half is out
    /// of range.
    pub fn from_hhmm(hhmm: u16) -> Result<Self, ValidationError> {
        Self::from_hm(hhmm / 100, hhmm % 100)
    }

    /// Local time of day of `ts` in the given fixed offset.
    #[must_use]
    pub fn at(ts: Timestamp, offset: FixedOffset) -> Self {
        Self::from(ts.with_timezone(&offset).time())
    }

    #[must_use]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[must_use]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// The `HHMM` integer form, e.g. `1930` for 19:30.
    #[must_use]
    pub fn hhmm(self) -> u16 {
        self.hour() * 100 + self.minute()
    }

    /// Shift by a signed number of seconds, wrapping around midnight.
    ///
    /// Sub-minute remainders are truncated toward the earlier minute.
    #[must_use]
    pub fn shifted(self, seconds: i64) -> Self {
        let total = i64::from(self.0) * 60 + seconds;
        let wrapped = total.div_euclid(60).rem_euclid(MINUTES_PER_DAY);
        // wrapped is within 0..1440
        Self(u16::try_from(wrapped).unwrap_or_default())
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        // hour() < 24 and minute() < 60, both fit in u16
        let hour = u16::try_from(time.hour()).unwrap_or_default();
        let minute = u16::try_from(time.minute()).unwrap_or_default();
        Self(hour * 60 + minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    /// Accepts `HH:MM`, `H:MM` and the compact `HHMM` form.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime {
            value: value.to_string(),
        };
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        let text = value.trim();
        match text.split_once(':') {
            Some((hour, minute)) => {
                if hour.len() > 2 || minute.len() != 2 || !all_digits(hour) || !all_digits(minute) {
                    return Err(invalid());
                }
                let hour: u16 = hour.parse().map_err(|_| invalid())?;
                let minute: u16 = minute.parse().map_err(|_| invalid())?;
                Self::from_hm(hour, minute).map_err(|_| invalid())
            }
            None => {
                if text.len() > 4 || !all_digits(text) {
                    return Err(invalid());
                }
                let hhmm: u16 = text.parse().map_err(|_| invalid())?;
                Self::from_hhmm(hhmm).map_err(|_| invalid())
            }
        }
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u16),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Raw::Number(hhmm) => Self::from_hhmm(hhmm).map_err(serde::de::Error::custom),
        }
    }
}
