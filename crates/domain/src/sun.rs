//! Sun times: sunset/sunrise resolved into local clock times.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::time::{ClockTime, Timestamp};

/// Sun event instants as reported by the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunEvents {
    pub sunrise: Timestamp,
    pub sunset: Timestamp,
}

/// Clock values used when `sunset` / `sunrise` anchors are resolved.
///
/// `sunset` and `sunrise` are the effective anchors; the `actual_*` fields
/// keep the unshifted local times for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunset: ClockTime,
    pub sunrise: ClockTime,
    pub actual_sunset: ClockTime,
    pub actual_sunrise: ClockTime,
    /// Seconds moved off each event: sunset earlier, sunrise later.
    pub shift_secs: i64,
    pub refreshed_at: Option<Timestamp>,
}

impl SunTimes {
    /// Convert sun events to local clock times and apply the shift.
    #[must_use]
    pub fn resolve(
        events: SunEvents,
        utc_offset: FixedOffset,
        shift_secs: i64,
        refreshed_at: Timestamp,
    ) -> Self {
        let actual_sunset = ClockTime::at(events.sunset, utc_offset);
        let actual_sunrise = ClockTime::at(events.sunrise, utc_offset);
        Self::from_actual(actual_sunset, actual_sunrise, shift_secs, Some(refreshed_at))
    }

    /// Build from local clock times already known.
    #[must_use]
    pub fn from_actual(
        actual_sunset: ClockTime,
        actual_sunrise: ClockTime,
        shift_secs: i64,
        refreshed_at: Option<Timestamp>,
    ) -> Self {
        Self {
            sunset: actual_sunset.shifted(-shift_secs),
            sunrise: actual_sunrise.shifted(shift_secs),
            actual_sunset,
            actual_sunrise,
            shift_secs,
            refreshed_at,
        }
    }
}

impl Default for SunTimes {
    /// 20:00 / 05:00 until the first lookup succeeds.
    fn default() -> Self {
        let sunset = ClockTime::from_hm(20, 0).unwrap_or(ClockTime::MIDNIGHT);
        let sunrise = ClockTime::from_hm(5, 0).unwrap_or(ClockTime::MIDNIGHT);
        Self {
            sunset,
            sunrise,
            actual_sunset: sunset,
            actual_sunrise: sunrise,
            shift_secs: 0,
            refreshed_at: None,
        }
    }
}
