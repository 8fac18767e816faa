//! Crew travel times between stations.
//!
//! A relief driver has to get from wherever they are idling to the station
//! where the uncovered circulation starts, and back again afterwards. This
//! module provides a symmetric lookup table of such times with two kinds of
//! fallback for unlisted pairs: named aliases (a depot that shares times
//! with a nearby station) and a hop-count estimate over the station graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{StationCode, StationGraph};

/// Something that can estimate crew travel minutes between two stations.
///
/// The planner takes this as a seam so tests can supply fixed tables.
pub trait TravelLookup {
    /// Minutes to travel from `from` to `to`. Never negative.
    fn minutes(&self, from: StationCode, to: StationCode) -> i32;
}

/// A location that borrows the travel times of another station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Station whose times are used.
    pub station: StationCode,
    /// Extra minutes to get between the location and that station.
    #[serde(default)]
    pub extra_minutes: i32,
}

/// Symmetric travel-time table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTravelTimes", into = "RawTravelTimes")]
pub struct TravelTimes {
    /// Map from (from, to) to minutes, stored in both directions.
    pairs: HashMap<(StationCode, StationCode), i32>,
    fallbacks: HashMap<StationCode, Fallback>,
    minutes_per_hop: i32,
    unreachable_minutes: i32,
}

/// Default minutes per graph hop when a pair is not listed.
pub const DEFAULT_MINUTES_PER_HOP: i32 = 3;

/// Minutes assumed between stations with no listed time and no path.
pub const DEFAULT_UNREACHABLE_MINUTES: i32 = 90;

impl Default for TravelTimes {
    fn default() -> Self {
        Self {
            pairs: HashMap::new(),
            fallbacks: HashMap::new(),
            minutes_per_hop: DEFAULT_MINUTES_PER_HOP,
            unreachable_minutes: DEFAULT_UNREACHABLE_MINUTES,
        }
    }
}

impl TravelTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a travel time, stored symmetrically.
    pub fn add(&mut self, from: StationCode, to: StationCode, minutes: i32) {
        let minutes = minutes.max(0);
        self.pairs.insert((from, to), minutes);
        self.pairs.insert((to, from), minutes);
    }

    /// Make `location` borrow the times of `fallback.station`.
    pub fn add_fallback(&mut self, location: StationCode, fallback: Fallback) {
        self.fallbacks.insert(location, fallback);
    }

    pub fn set_minutes_per_hop(&mut self, minutes: i32) {
        self.minutes_per_hop = minutes.max(0);
    }

    pub fn minutes_per_hop(&self) -> i32 {
        self.minutes_per_hop
    }

    /// Listed time for a pair, without any fallback.
    pub fn get(&self, from: &StationCode, to: &StationCode) -> Option<i32> {
        self.pairs.get(&(*from, *to)).copied()
    }

    /// Returns the number of listed pairs (counting A→B and B→A as one).
    pub fn len(&self) -> usize {
        self.pairs.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Combine the table with a graph for hop-distance estimates.
    pub fn with_graph<'a>(&'a self, graph: &'a StationGraph) -> GraphTravel<'a> {
        GraphTravel { table: self, graph }
    }

    /// Table lookup through fallbacks; `None` if still unlisted.
    fn lookup_listed(&self, from: StationCode, to: StationCode) -> Option<i32> {
        if from == to {
            return Some(0);
        }
        if let Some(minutes) = self.get(&from, &to) {
            return Some(minutes);
        }

        let (from_station, from_extra) = self.resolve(from);
        let (to_station, to_extra) = self.resolve(to);
        if (from_station, to_station) == (from, to) {
            return None;
        }
        let core = if from_station == to_station {
            0
        } else {
            self.get(&from_station, &to_station)?
        };
        Some(core + from_extra + to_extra)
    }

    fn resolve(&self, location: StationCode) -> (StationCode, i32) {
        match self.fallbacks.get(&location) {
            Some(fb) => (fb.station, fb.extra_minutes),
            None => (location, 0),
        }
    }
}

impl TravelLookup for TravelTimes {
    fn minutes(&self, from: StationCode, to: StationCode) -> i32 {
        self.lookup_listed(from, to)
            .unwrap_or(self.unreachable_minutes)
    }
}

/// Travel table backed by hop distances on a station graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphTravel<'a> {
    table: &'a TravelTimes,
    graph: &'a StationGraph,
}

impl TravelLookup for GraphTravel<'_> {
    fn minutes(&self, from: StationCode, to: StationCode) -> i32 {
        if let Some(minutes) = self.table.lookup_listed(from, to) {
            return minutes;
        }

        let (from_station, from_extra) = self.table.resolve(from);
        let (to_station, to_extra) = self.table.resolve(to);
        match self.graph.hop_distance(from_station, to_station) {
            Some(hops) => hops as i32 * self.table.minutes_per_hop + from_extra + to_extra,
            None => self.table.unreachable_minutes,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawTravelTimes {
    #[serde(default)]
    pairs: Vec<(StationCode, StationCode, i32)>,
    #[serde(default)]
    fallbacks: HashMap<StationCode, Fallback>,
    #[serde(default = "default_minutes_per_hop")]
    minutes_per_hop: i32,
    #[serde(default = "default_unreachable_minutes")]
    unreachable_minutes: i32,
}

fn default_minutes_per_hop() -> i32 {
    DEFAULT_MINUTES_PER_HOP
}

fn default_unreachable_minutes() -> i32 {
    DEFAULT_UNREACHABLE_MINUTES
}

impl From<RawTravelTimes> for TravelTimes {
    fn from(raw: RawTravelTimes) -> Self {
        let mut table = TravelTimes {
            fallbacks: raw.fallbacks,
            minutes_per_hop: raw.minutes_per_hop.max(0),
            unreachable_minutes: raw.unreachable_minutes.max(0),
            ..TravelTimes::default()
        };
        for (from, to, minutes) in raw.pairs {
            table.add(from, to, minutes);
        }
        table
    }
}

impl From<TravelTimes> for RawTravelTimes {
    fn from(table: TravelTimes) -> Self {
        let mut pairs: Vec<(StationCode, StationCode, i32)> = table
            .pairs
            .iter()
            .filter(|((a, b), _)| a < b)
            .map(|((a, b), m)| (*a, *b, *m))
            .collect();
        pairs.sort();
        RawTravelTimes {
            pairs,
            fallbacks: table.fallbacks,
            minutes_per_hop: table.minutes_per_hop,
            unreachable_minutes: table.unreachable_minutes,
        }
    }
}

/// Builder for creating travel tables.
///
/// Provides a fluent API for adding pairs; invalid codes are skipped.
#[derive(Debug, Default)]
pub struct TravelTimesBuilder {
    inner: TravelTimes,
}

impl TravelTimesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symmetric travel time.
    pub fn add(mut self, from: &str, to: &str, minutes: i32) -> Self {
        if let (Ok(from), Ok(to)) = (StationCode::parse(from), StationCode::parse(to)) {
            self.inner.add(from, to, minutes);
        }
        self
    }

    /// Make `location` borrow the times of `station`.
    pub fn fallback(mut self, location: &str, station: &str, extra_minutes: i32) -> Self {
        if let (Ok(location), Ok(station)) =
            (StationCode::parse(location), StationCode::parse(station))
        {
            self.inner.add_fallback(
                location,
                Fallback {
                    station,
                    extra_minutes,
                },
            );
        }
        self
    }

    pub fn minutes_per_hop(mut self, minutes: i32) -> Self {
        self.inner.set_minutes_per_hop(minutes);
        self
    }

    pub fn build(self) -> TravelTimes {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeKey, StationNode};

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn graph(codes: &[&str]) -> StationGraph {
        let stations = codes
            .iter()
            .map(|c| StationNode {
                code: code(c),
                name: String::new(),
                is_depot: false,
            })
            .collect();
        let edges = codes
            .windows(2)
            .map(|w| EdgeKey::new(code(w[0]), code(w[1])))
            .collect();
        StationGraph::new(stations, edges, vec![]).unwrap()
    }

    #[test]
    fn empty_table() {
        let table = TravelTimes::new();
        assert!(table.is_empty());
        assert_eq!(table.minutes(code("PC"), code("PC")), 0);
        assert_eq!(
            table.minutes(code("PC"), code("SR")),
            DEFAULT_UNREACHABLE_MINUTES
        );
    }

    #[test]
    fn lookup_is_symmetric() {
        let table = TravelTimesBuilder::new().add("PC", "SR", 12).build();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&code("PC"), &code("SR")), Some(12));
        assert_eq!(table.get(&code("SR"), &code("PC")), Some(12));
        assert_eq!(table.minutes(code("SR"), code("PC")), 12);
    }

    #[test]
    fn named_fallback_borrows_station_times() {
        let table = TravelTimesBuilder::new()
            .add("RB", "SC", 10)
            .fallback("COT", "RB", 4)
            .build();
        assert_eq!(table.minutes(code("COT"), code("SC")), 14);
        assert_eq!(table.minutes(code("SC"), code("COT")), 14);
        assert_eq!(table.minutes(code("COT"), code("RB")), 4);
    }

    #[test]
    fn graph_distance_default() {
        let table = TravelTimesBuilder::new().minutes_per_hop(4).build();
        let g = graph(&["PC", "GR", "SR", "TT"]);
        let travel = table.with_graph(&g);
        assert_eq!(travel.minutes(code("PC"), code("TT")), 12);
        assert_eq!(travel.minutes(code("PC"), code("ZZ")), DEFAULT_UNREACHABLE_MINUTES);
    }

    #[test]
    fn listed_time_beats_graph_estimate() {
        let table = TravelTimesBuilder::new().add("PC", "TT", 7).build();
        let g = graph(&["PC", "GR", "SR", "TT"]);
        assert_eq!(table.with_graph(&g).minutes(code("TT"), code("PC")), 7);
    }

    #[test]
    fn builder_ignores_invalid_codes() {
        let table = TravelTimesBuilder::new()
            .add("pc", "SR", 5)
            .add("PC", "SR", 5)
            .build();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn json_shape() {
        let json = r#"{"pairs":[["PC","SR",12]],"fallbacks":{"COT":{"station":"RB"}}}"#;
        let table: TravelTimes = serde_json::from_str(json).unwrap();
        assert_eq!(table.minutes(code("SR"), code("PC")), 12);
        assert_eq!(table.minutes_per_hop(), DEFAULT_MINUTES_PER_HOP);
    }
}
