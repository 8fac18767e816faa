//! Crew shifts and the circulations they cover.
//!
//! These are read-only snapshot types: they are deserialized once per
//! planning request and never mutated by the planner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{FgcTime, LineCode, StationCode};

/// A stop made by a circulation between its origin and destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub station: StationCode,
    #[serde(default, with = "super::time::lenient")]
    pub time: Option<FgcTime>,
}

/// A single scheduled train run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circulation {
    pub id: String,
    pub line: LineCode,
    pub origin: StationCode,
    pub destination: StationCode,
    #[serde(default, with = "super::time::lenient")]
    pub departure: Option<FgcTime>,
    #[serde(default, with = "super::time::lenient")]
    pub arrival: Option<FgcTime>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub tracks: Vec<u8>,
}

impl Circulation {
    /// Departure and arrival, if both parsed.
    pub fn times(&self) -> Option<(FgcTime, FgcTime)> {
        Some((self.departure?, self.arrival?))
    }

    /// Every timed call of this circulation in running order, origin and
    /// destination included.
    pub fn timed_calls(&self) -> Vec<(StationCode, FgcTime)> {
        let mut calls = Vec::with_capacity(self.stops.len() + 2);
        if let Some(dep) = self.departure {
            calls.push((self.origin, dep));
        }
        calls.extend(
            self.stops
                .iter()
                .filter_map(|stop| Some((stop.station, stop.time?))),
        );
        if let Some(arr) = self.arrival {
            calls.push((self.destination, arr));
        }
        calls
    }

    /// Time at which this circulation calls at `station`, if it does.
    pub fn time_at(&self, station: &StationCode) -> Option<FgcTime> {
        self.timed_calls()
            .into_iter()
            .find(|(s, _)| s == station)
            .map(|(_, t)| t)
    }
}

/// A reference from a shift to one of its circulations.
///
/// A passenger transfer is a run the crew rides as passengers to reposition;
/// it may carry a crew-specific origin and destination that differ from the
/// train's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CirculationRef {
    Direct {
        id: String,
    },
    PassengerTransfer {
        real_id: String,
        #[serde(default)]
        origin: Option<StationCode>,
        #[serde(default)]
        destination: Option<StationCode>,
    },
}

impl CirculationRef {
    /// Id of the circulation this reference points at.
    pub fn circulation_id(&self) -> &str {
        match self {
            CirculationRef::Direct { id } => id,
            CirculationRef::PassengerTransfer { real_id, .. } => real_id,
        }
    }

    pub fn is_passenger_transfer(&self) -> bool {
        matches!(self, CirculationRef::PassengerTransfer { .. })
    }

    /// Resolve against the circulation table, applying crew overrides.
    ///
    /// Returns `None` when the id is unknown.
    pub fn resolve(&self, circulations: &CirculationIndex) -> Option<Circulation> {
        let base = circulations.get(self.circulation_id())?;
        let mut resolved = base.clone();
        if let CirculationRef::PassengerTransfer {
            origin,
            destination,
            ..
        } = self
        {
            if let Some(origin) = origin {
                resolved.origin = *origin;
            }
            if let Some(destination) = destination {
                resolved.destination = *destination;
            }
        }
        Some(resolved)
    }
}

/// A crew duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub service_code: String,
    #[serde(default, with = "super::time::lenient")]
    pub start: Option<FgcTime>,
    #[serde(default, with = "super::time::lenient")]
    pub end: Option<FgcTime>,
    pub home_depot: StationCode,
    #[serde(default)]
    pub circulations: Vec<CirculationRef>,
}

impl Shift {
    /// Start and end, if both parsed and correctly ordered.
    pub fn span(&self) -> Option<(FgcTime, FgcTime)> {
        let (start, end) = (self.start?, self.end?);
        (start <= end).then_some((start, end))
    }

    /// Reserve shifts stand by without fixed circulations.
    pub fn is_reserve(&self) -> bool {
        self.circulations.is_empty()
    }
}

/// Which driver works which shift today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAssignment {
    pub shift_id: String,
    pub driver_id: String,
}

/// Contact numbers by driver id.
pub type Phonebook = HashMap<String, Vec<String>>;

/// Circulations by id.
#[derive(Debug, Clone, Default)]
pub struct CirculationIndex {
    by_id: HashMap<String, Circulation>,
}

impl CirculationIndex {
    pub fn new(circulations: impl IntoIterator<Item = Circulation>) -> Self {
        Self {
            by_id: circulations
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Circulation> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All circulations of a line, in id order for reproducible iteration.
    pub fn on_line(&self, line: &LineCode) -> Vec<&Circulation> {
        let mut found: Vec<&Circulation> =
            self.by_id.values().filter(|c| &c.line == line).collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn circulation() -> Circulation {
        Circulation {
            id: "A001".into(),
            line: LineCode::new("S1"),
            origin: code("PC"),
            destination: code("NA"),
            departure: FgcTime::parse_hhmm("10:00").ok(),
            arrival: FgcTime::parse_hhmm("10:55").ok(),
            stops: vec![Stop {
                station: code("SC"),
                time: FgcTime::parse_hhmm("10:25").ok(),
            }],
            tracks: vec![1, 2],
        }
    }

    #[test]
    fn direct_ref_resolves_unchanged() {
        let index = CirculationIndex::new([circulation()]);
        let r = CirculationRef::Direct { id: "A001".into() };
        assert_eq!(r.resolve(&index), Some(circulation()));
    }

    #[test]
    fn passenger_transfer_applies_overrides() {
        let index = CirculationIndex::new([circulation()]);
        let r = CirculationRef::PassengerTransfer {
            real_id: "A001".into(),
            origin: Some(code("SC")),
            destination: None,
        };
        let resolved = r.resolve(&index).unwrap();
        assert_eq!(resolved.origin, code("SC"));
        assert_eq!(resolved.destination, code("NA"));
        assert!(r.is_passenger_transfer());
    }

    #[test]
    fn unknown_ref_is_none() {
        let index = CirculationIndex::new([circulation()]);
        let r = CirculationRef::Direct { id: "ZZZ".into() };
        assert!(r.resolve(&index).is_none());
    }

    #[test]
    fn timed_calls_and_lookup() {
        let c = circulation();
        let calls = c.timed_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(c.time_at(&code("SC")), FgcTime::parse_hhmm("10:25").ok());
        assert_eq!(c.time_at(&code("GR")), None);
    }

    #[test]
    fn ref_json_shapes() {
        let direct: CirculationRef =
            serde_json::from_str(r#"{"kind":"direct","id":"A1"}"#).unwrap();
        assert_eq!(direct.circulation_id(), "A1");

        let transfer: CirculationRef = serde_json::from_str(
            r#"{"kind":"passenger_transfer","real_id":"A2","destination":"SR"}"#,
        )
        .unwrap();
        assert_eq!(transfer.circulation_id(), "A2");
    }

    #[test]
    fn malformed_shift_times_are_dropped() {
        let shift: Shift = serde_json::from_str(
            r#"{"id":"Q1","service_code":"LAB","start":"6h","end":"14:00","home_depot":"RB"}"#,
        )
        .unwrap();
        assert!(shift.start.is_none());
        assert!(shift.span().is_none());
        assert!(shift.is_reserve());
    }
}
