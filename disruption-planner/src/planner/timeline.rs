//! Busy/idle decomposition of a shift.
//!
//! A shift timeline is an ordered list of segments that tile the shift span
//! exactly: each segment starts where the previous one ended, the first
//! starts at the shift start and the last ends at the shift end. The
//! constructor checks this, so code holding a `ShiftTimeline` can rely on
//! it.

use serde::Serialize;
use tracing::debug;

use crate::domain::{CirculationIndex, DomainError, FgcTime, Shift, StationCode};

/// Whether the crew is working a circulation or free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Busy,
    Idle,
}

/// A contiguous stretch of a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: FgcTime,
    pub end: FgcTime,
    pub kind: SegmentKind,
    /// For idle segments, where the crew waits. For busy ones, where the
    /// circulation departs.
    pub location: StationCode,
    pub circulation_id: Option<String>,
    /// Busy riding as a passenger rather than driving.
    pub passenger: bool,
}

impl Segment {
    fn idle(start: FgcTime, end: FgcTime, location: StationCode) -> Self {
        Self {
            start,
            end,
            kind: SegmentKind::Idle,
            location,
            circulation_id: None,
            passenger: false,
        }
    }

    pub fn duration(&self) -> i32 {
        self.end.minutes_since(self.start)
    }

    pub fn is_idle(&self) -> bool {
        self.kind == SegmentKind::Idle
    }
}

/// The validated segment list of one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftTimeline {
    shift_id: String,
    start: FgcTime,
    end: FgcTime,
    home_depot: StationCode,
    segments: Vec<Segment>,
}

impl ShiftTimeline {
    /// Build a timeline, checking that `segments` tile `[start, end]`.
    pub fn new(
        shift_id: impl Into<String>,
        start: FgcTime,
        end: FgcTime,
        home_depot: StationCode,
        segments: Vec<Segment>,
    ) -> Result<Self, DomainError> {
        let mut cursor = start;
        for segment in &segments {
            if segment.start != cursor {
                return Err(DomainError::BrokenTiling {
                    expected: cursor,
                    found: segment.start,
                });
            }
            if segment.end <= segment.start {
                return Err(DomainError::ReversedSegment {
                    start: segment.start,
                    end: segment.end,
                });
            }
            cursor = segment.end;
        }
        if cursor != end {
            return Err(DomainError::BrokenTiling {
                expected: end,
                found: cursor,
            });
        }

        Ok(Self {
            shift_id: shift_id.into(),
            start,
            end,
            home_depot,
            segments,
        })
    }

    pub fn shift_id(&self) -> &str {
        &self.shift_id
    }

    pub fn start(&self) -> FgcTime {
        self.start
    }

    pub fn end(&self) -> FgcTime {
        self.end
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Idle segments with their index in the timeline.
    pub fn idle_segments(&self) -> impl Iterator<Item = (usize, &Segment)> {
        self.segments.iter().enumerate().filter(|(_, s)| s.is_idle())
    }

    /// Where the crew has to be when the segment at `index` ends: the
    /// departure station of the next segment, or the home depot at the end
    /// of the shift.
    pub fn exit_location(&self, index: usize) -> StationCode {
        self.segments
            .get(index + 1)
            .map(|next| next.location)
            .unwrap_or(self.home_depot)
    }
}

/// Decompose a shift into busy and idle segments.
///
/// Circulations are taken in departure order. Overlapping circulations never
/// move the cursor backwards, and busy time is clamped to the shift span so
/// the result always tiles it. Returns `None` when the shift has no usable
/// start/end times. Unknown circulation ids and circulations with malformed
/// times are skipped.
pub fn analyze_shift(shift: &Shift, circulations: &CirculationIndex) -> Option<ShiftTimeline> {
    let (start, end) = shift.span()?;

    let mut runs: Vec<_> = shift
        .circulations
        .iter()
        .filter_map(|r| {
            let resolved = r.resolve(circulations);
            if resolved.is_none() {
                debug!(
                    shift = %shift.id,
                    circulation = r.circulation_id(),
                    "Unknown circulation in shift, skipping"
                );
            }
            let circulation = resolved?;
            let (dep, arr) = circulation.times()?;
            Some((dep, arr, circulation, r.is_passenger_transfer()))
        })
        .collect();
    runs.sort_by(|a, b| (a.0, a.1, &a.2.id).cmp(&(b.0, b.1, &b.2.id)));

    let mut segments = Vec::with_capacity(runs.len() * 2 + 1);
    let mut position = start;
    let mut location = shift.home_depot;

    for (departure, arrival, circulation, passenger) in runs {
        if position >= end {
            break;
        }

        if departure > position {
            let idle_end = departure.min(end);
            segments.push(Segment::idle(position, idle_end, location));
            position = idle_end;
        }

        let busy_end = arrival.min(end);
        if busy_end > position {
            segments.push(Segment {
                start: position,
                end: busy_end,
                kind: SegmentKind::Busy,
                location: circulation.origin,
                circulation_id: Some(circulation.id.clone()),
                passenger,
            });
            position = busy_end;
        }
        location = circulation.destination;
    }

    if position < end {
        segments.push(Segment::idle(position, end, location));
    }

    match ShiftTimeline::new(shift.id.clone(), start, end, shift.home_depot, segments) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            debug!(shift = %shift.id, error = %e, "Shift timeline failed validation");
            None
        }
    }
}
