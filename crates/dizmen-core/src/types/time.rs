//! # Time of Day
//!
//! `ClockTime` and `TimeRange`, the two value types the availability engine works on.
//!
//! A `ClockTime` is a wall-clock minute (`00:00` ..= `23:59`). Dates, seconds and time
//! zones are deliberately absent: converting an instant into a `ClockTime` is the
//! caller's job (see [`ClockTime::from_time`] and [`ClockTime::now_in`]).

use crate::DizmenError;
use chrono::{Local, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

// =============================================================================
// CLOCK TIME
// =============================================================================

/// A time of day at minute resolution, written as zero-padded 24-hour `HH:mm`.
///
/// Ordering follows the clock, which is also the lexical order of the `HH:mm` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// `00:00`.
    pub const MIDNIGHT: Self = Self(0);

    /// `23:59`.
    pub const LAST_MINUTE: Self = Self(MINUTES_PER_DAY - 1);

    /// Build a time from hour and minute. Returns `None` when out of range.
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(hour as u16 * 60 + minute as u16))
    }

    /// Build a time from minutes since midnight. Returns `None` past `23:59`.
    #[must_use]
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self(minutes))
    }

    /// Parse a strict `HH:mm` string.
    pub fn parse(s: &str) -> Result<Self, DizmenError> {
        // `%H` alone also accepts `7:05` and a leading space.
        let padded = s.len() == 5
            && s.bytes()
                .enumerate()
                .all(|(i, b)| if i == 2 { b == b':' } else { b.is_ascii_digit() });
        if !padded {
            return Err(DizmenError::InvalidClockTime(s.to_string()));
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(|time| Self::from_time(&time))
            .map_err(|_| DizmenError::InvalidClockTime(s.to_string()))
    }

    /// Truncate any `Timelike` value (seconds and below are dropped).
    #[must_use]
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        // hour() < 24 and minute() < 60 by construction.
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    /// The current time of day on the host's local clock.
    #[must_use]
    pub fn now_local() -> Self {
        Self::from_time(&Local::now())
    }

    /// The current time of day in the given IANA time zone.
    #[must_use]
    pub fn now_in(tz: &Tz) -> Self {
        Self::from_time(&Utc::now().with_timezone(tz))
    }

    #[must_use]
    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    #[must_use]
    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    #[must_use]
    pub const fn minutes_since_midnight(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = DizmenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = DizmenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

// =============================================================================
// TIME RANGE
// =============================================================================

/// A daily recurring window `[start_time, end_time]`, both ends inclusive.
///
/// There is no wrap-around past midnight: a range whose start is after its end
/// contains no time at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl TimeRange {
    #[must_use]
    pub const fn new(start_time: ClockTime, end_time: ClockTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Parse `"HH:mm-HH:mm"` (spaces around the dash are allowed).
    pub fn parse(s: &str) -> Result<Self, DizmenError> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| DizmenError::InvalidClockTime(s.to_string()))?;
        Ok(Self::new(
            ClockTime::parse(start.trim())?,
            ClockTime::parse(end.trim())?,
        ))
    }

    /// Inclusive containment check.
    #[must_use]
    pub fn contains(&self, time: ClockTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    /// True when the start is after the end, i.e. the range never matches.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.start_time > self.end_time
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_time, self.end_time)
    }
}

// =============================================================================
// TESTS
// =============================================================================
