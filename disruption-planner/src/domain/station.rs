//! Station code types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code {input:?}: {reason}")]
pub struct InvalidStationCode {
    input: String,
    reason: &'static str,
}

/// Longest station or depot code in the operator's timetable data.
const MAX_LEN: usize = 4;

/// A short station or depot code, such as `PC` or `SR`.
///
/// Codes are 1–4 uppercase ASCII letters or digits. This type guarantees
/// that any `StationCode` value is valid by construction, and is `Copy` so
/// graph searches can pass it around freely.
///
/// # Examples
///
/// ```
/// use disruption_planner::domain::StationCode;
///
/// let sr = StationCode::parse("SR").unwrap();
/// assert_eq!(sr.as_str(), "SR");
///
/// assert!(StationCode::parse("sr").is_err());
/// assert!(StationCode::parse("").is_err());
/// assert!(StationCode::parse("TOOLONG").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationCode {
    len: u8,
    bytes: [u8; MAX_LEN],
}

impl StationCode {
    /// Parse a station code from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        let bytes = s.as_bytes();

        if bytes.is_empty() || bytes.len() > MAX_LEN {
            return Err(InvalidStationCode {
                input: s.to_string(),
                reason: "must be 1-4 characters",
            });
        }

        if !bytes
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(InvalidStationCode {
                input: s.to_string(),
                reason: "must be uppercase ASCII letters or digits",
            });
        }

        let mut buf = [0u8; MAX_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            len: bytes.len() as u8,
            bytes: buf,
        })
    }

    /// Parse a station code, normalizing case and whitespace first.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidStationCode> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl Ord for StationCode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for StationCode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for StationCode {
    type Error = InvalidStationCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StationCode> for String {
    fn from(value: StationCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.as_str())
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
