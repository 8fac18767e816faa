//! FGC-day time handling.
//!
//! Timetables provide times as "HH:MM" strings. The operator's service day
//! starts at 04:00, so a time such as "01:30" belongs to the end of the
//! previous day's timeline rather than the start of the next one. This
//! module maps clock strings onto a single monotonic minute axis so shift
//! timelines never wrap mid-schedule.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minutes in a calendar day.
pub const MINUTES_PER_DAY: i32 = 1440;

/// Clock hour at which the service day starts. Earlier hours are pushed to
/// the end of the previous service day.
pub const DAY_BOUNDARY_HOUR: u32 = 4;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A point on the FGC-day minute axis.
///
/// The value is minutes after midnight of the service day, with clock
/// hours 00–03 mapped to 1440–1679.
///
/// # Examples
///
/// ```
/// use disruption_planner::domain::FgcTime;
///
/// let late = FgcTime::parse_hhmm("01:30").unwrap();
/// assert_eq!(late.minutes(), 1440 + 90);
/// assert_eq!(late.to_string(), "01:30");
///
/// let morning = FgcTime::parse_hhmm("06:00").unwrap();
/// assert!(morning < late);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FgcTime(i32);

impl FgcTime {
    /// Create a time from a raw minute value on the FGC-day axis.
    pub const fn from_minutes(minutes: i32) -> Self {
        Self(minutes)
    }

    /// Parse an "HH:MM" clock string, applying the 04:00 day-boundary rule.
    ///
    /// # Examples
    ///
    /// ```
    /// use disruption_planner::domain::FgcTime;
    ///
    /// assert!(FgcTime::parse_hhmm("00:00").is_ok());
    /// assert!(FgcTime::parse_hhmm("23:59").is_ok());
    /// assert!(FgcTime::parse_hhmm("4:00").is_err());
    /// assert!(FgcTime::parse_hhmm("24:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let mut minutes = (hour * 60 + minute) as i32;
        if hour < DAY_BOUNDARY_HOUR {
            minutes += MINUTES_PER_DAY;
        }
        Ok(Self(minutes))
    }

    /// Minutes on the FGC-day axis.
    pub const fn minutes(self) -> i32 {
        self.0
    }

    /// Signed minutes from `earlier` to `self`.
    pub const fn minutes_since(self, earlier: FgcTime) -> i32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<i32> for FgcTime {
    type Output = Self;

    fn add(self, rhs: i32) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<i32> for FgcTime {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl Add<Duration> for FgcTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self + whole_minutes(rhs)
    }
}

impl Sub<Duration> for FgcTime {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        self - whole_minutes(rhs)
    }
}

/// Whole minutes of a duration, clamped to the axis range.
fn whole_minutes(d: Duration) -> i32 {
    d.num_minutes().clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl fmt::Debug for FgcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FgcTime({} = {})", self, self.0)
    }
}

impl fmt::Display for FgcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hhmm(self.0))
    }
}

impl Serialize for FgcTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FgcTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FgcTime::parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

/// Lenient "HH:MM" to FGC-day minutes.
///
/// Returns `None` on malformed input instead of failing; callers exclude
/// such values from temporal reasoning.
///
/// ```
/// use disruption_planner::domain::to_minutes;
///
/// assert_eq!(to_minutes("10:00"), Some(600));
/// assert_eq!(to_minutes("02:15"), Some(1440 + 135));
/// assert_eq!(to_minutes("garbage"), None);
/// ```
pub fn to_minutes(s: &str) -> Option<i32> {
    FgcTime::parse_hhmm(s.trim()).ok().map(FgcTime::minutes)
}

/// FGC-day minutes to "HH:MM", wrapping values past midnight into 00–23.
///
/// Only minutes in `240..1680` (04:00 to 03:59 of the next day) have a
/// canonical reading: `to_minutes(&to_hhmm(m)) == Some(m)` holds there and
/// nowhere else. Other values render as the wrapped clock time.
pub fn to_hhmm(minutes: i32) -> String {
    let wrapped = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// Serde adapter for optional times that must not reject a whole snapshot.
///
/// Use with `#[serde(default, with = "crate::domain::time::lenient")]`.
/// Missing, null and malformed strings all become `None`.
pub mod lenient {
    use super::FgcTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<FgcTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FgcTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| FgcTime::parse_hhmm(s.trim()).ok()))
    }
}
