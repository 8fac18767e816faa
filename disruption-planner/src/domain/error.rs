//! Domain error types.
//!
//! These errors represent invariant violations caught while constructing
//! domain values. Planning operations themselves never fail; they return
//! partial results instead.

use super::{FgcTime, StationCode};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// An edge or branch refers to a station missing from the graph
    #[error("unknown station {0}")]
    UnknownStation(StationCode),

    /// An edge connects a station to itself
    #[error("segment from {0} to itself")]
    SelfLoop(StationCode),

    /// A timeline leaves part of its shift uncovered or covers it twice
    #[error("segments do not tile the shift: expected {expected} but found {found}")]
    BrokenTiling { expected: FgcTime, found: FgcTime },

    /// A timeline segment ends before it starts
    #[error("segment ends at {end} before it starts at {start}")]
    ReversedSegment { start: FgcTime, end: FgcTime },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let sr = StationCode::parse("SR").unwrap();
        assert_eq!(
            DomainError::UnknownStation(sr).to_string(),
            "unknown station SR"
        );
        assert_eq!(
            DomainError::SelfLoop(sr).to_string(),
            "segment from SR to itself"
        );

        let err = DomainError::BrokenTiling {
            expected: FgcTime::from_minutes(600),
            found: FgcTime::from_minutes(610),
        };
        assert_eq!(
            err.to_string(),
            "segments do not tile the shift: expected 10:00 but found 10:10"
        );

        let err = DomainError::ReversedSegment {
            start: FgcTime::from_minutes(610),
            end: FgcTime::from_minutes(600),
        };
        assert_eq!(err.to_string(), "segment ends at 10:00 before it starts at 10:10");
    }
}
