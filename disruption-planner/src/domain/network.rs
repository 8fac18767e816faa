//! Physical network topology and incident cuts.
//!
//! Every edge of the station graph is a double-track segment. Each of the
//! two tracks can be cut independently; a segment is impassable only when
//! both tracks are cut or when either end station is blocked.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::{DomainError, StationCode};

/// One of the two running tracks of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackId {
    /// Track 1, conventionally used by ascending (outbound) trains.
    #[serde(rename = "1")]
    One,
    /// Track 2, conventionally used by descending (inbound) trains.
    #[serde(rename = "2")]
    Two,
}

impl TrackId {
    pub const BOTH: [TrackId; 2] = [TrackId::One, TrackId::Two];
}

/// An undirected segment between two adjacent stations.
///
/// Endpoints are stored in sorted order so `(a, b)` and `(b, a)` compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(StationCode, StationCode)", into = "(StationCode, StationCode)")]
pub struct EdgeKey {
    low: StationCode,
    high: StationCode,
}

impl EdgeKey {
    pub fn new(a: StationCode, b: StationCode) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn ends(&self) -> (StationCode, StationCode) {
        (self.low, self.high)
    }
}

impl From<(StationCode, StationCode)> for EdgeKey {
    fn from((a, b): (StationCode, StationCode)) -> Self {
        Self::new(a, b)
    }
}

impl From<EdgeKey> for (StationCode, StationCode) {
    fn from(key: EdgeKey) -> Self {
        (key.low, key.high)
    }
}

/// A station or depot in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationNode {
    pub code: StationCode,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_depot: bool,
}

/// A named branch and the terminal its island is grown from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub terminal: StationCode,
}

/// Neighbour lists keyed by station, in sorted order for reproducible searches.
pub type Adjacency = BTreeMap<StationCode, Vec<StationCode>>;

/// Static station graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStationGraph", into = "RawStationGraph")]
pub struct StationGraph {
    stations: BTreeMap<StationCode, StationNode>,
    edges: BTreeSet<EdgeKey>,
    branches: Vec<Branch>,
}

#[derive(Serialize, Deserialize)]
struct RawStationGraph {
    stations: Vec<StationNode>,
    edges: Vec<EdgeKey>,
    #[serde(default)]
    branches: Vec<Branch>,
}

impl TryFrom<RawStationGraph> for StationGraph {
    type Error = DomainError;

    fn try_from(raw: RawStationGraph) -> Result<Self, Self::Error> {
        StationGraph::new(raw.stations, raw.edges, raw.branches)
    }
}

impl From<StationGraph> for RawStationGraph {
    fn from(graph: StationGraph) -> Self {
        RawStationGraph {
            stations: graph.stations.into_values().collect(),
            edges: graph.edges.into_iter().collect(),
            branches: graph.branches,
        }
    }
}

impl StationGraph {
    /// Build a graph, checking that every edge and branch terminal refers to
    /// a known station.
    pub fn new(
        stations: Vec<StationNode>,
        edges: Vec<EdgeKey>,
        branches: Vec<Branch>,
    ) -> Result<Self, DomainError> {
        let stations: BTreeMap<StationCode, StationNode> =
            stations.into_iter().map(|s| (s.code, s)).collect();

        for edge in &edges {
            let (a, b) = edge.ends();
            if a == b {
                return Err(DomainError::SelfLoop(a));
            }
            for end in [a, b] {
                if !stations.contains_key(&end) {
                    return Err(DomainError::UnknownStation(end));
                }
            }
        }

        for branch in &branches {
            if !stations.contains_key(&branch.terminal) {
                return Err(DomainError::UnknownStation(branch.terminal));
            }
        }

        Ok(Self {
            stations,
            edges: edges.into_iter().collect(),
            branches,
        })
    }

    pub fn contains(&self, station: &StationCode) -> bool {
        self.stations.contains_key(station)
    }

    pub fn station(&self, station: &StationCode) -> Option<&StationNode> {
        self.stations.get(station)
    }

    pub fn stations(&self) -> impl Iterator<Item = &StationNode> {
        self.stations.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.iter()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn depots(&self) -> impl Iterator<Item = StationCode> + '_ {
        self.stations.values().filter(|s| s.is_depot).map(|s| s.code)
    }

    /// Adjacency of the intact network.
    pub fn adjacency(&self) -> Adjacency {
        self.adjacency_under(&CutSet::default())
    }

    /// Adjacency with impassable segments and blocked stations removed.
    ///
    /// Blocked stations stay in the map with no neighbours so lookups on
    /// them succeed.
    pub fn adjacency_under(&self, cuts: &CutSet) -> Adjacency {
        self.filtered_adjacency(cuts, |edge| !cuts.is_edge_impassable(edge))
    }

    /// Adjacency keeping only segments with no cut track at all.
    pub fn clean_adjacency_under(&self, cuts: &CutSet) -> Adjacency {
        self.filtered_adjacency(cuts, |edge| cuts.cut_track_count(edge) == 0)
    }

    fn filtered_adjacency(&self, cuts: &CutSet, keep: impl Fn(&EdgeKey) -> bool) -> Adjacency {
        let mut adjacency: Adjacency = self
            .stations
            .keys()
            .map(|code| (*code, Vec::new()))
            .collect();

        for edge in &self.edges {
            let (a, b) = edge.ends();
            if cuts.is_station_blocked(&a) || cuts.is_station_blocked(&b) {
                continue;
            }
            if !keep(edge) {
                continue;
            }
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }

        for neighbours in adjacency.values_mut() {
            neighbours.sort();
        }
        adjacency
    }

    /// Unweighted shortest path on the intact network, endpoints included.
    pub fn shortest_path(&self, from: StationCode, to: StationCode) -> Option<Vec<StationCode>> {
        shortest_path(&self.adjacency(), from, to)
    }

    /// Hop count between two stations on the intact network.
    pub fn hop_distance(&self, from: StationCode, to: StationCode) -> Option<usize> {
        self.shortest_path(from, to).map(|p| p.len() - 1)
    }
}

/// Breadth-first shortest path over an adjacency map.
///
/// Neighbours are visited in sorted order, so ties between equal-length
/// paths always resolve the same way.
pub fn shortest_path(
    adjacency: &Adjacency,
    from: StationCode,
    to: StationCode,
) -> Option<Vec<StationCode>> {
    if !adjacency.contains_key(&from) || !adjacency.contains_key(&to) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut previous: HashMap<StationCode, StationCode> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    previous.insert(from, from);

    while let Some(station) = queue.pop_front() {
        for next in adjacency.get(&station).into_iter().flatten() {
            if previous.contains_key(next) {
                continue;
            }
            previous.insert(*next, station);
            if *next == to {
                let mut path = vec![to];
                let mut cursor = to;
                while cursor != from {
                    cursor = previous[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(*next);
        }
    }

    None
}

/// Stations reachable from `start` (including itself).
pub fn reachable_from(adjacency: &Adjacency, start: StationCode) -> BTreeSet<StationCode> {
    let mut seen = BTreeSet::new();
    if !adjacency.contains_key(&start) {
        return seen;
    }

    let mut queue = VecDeque::from([start]);
    seen.insert(start);
    while let Some(station) = queue.pop_front() {
        for next in adjacency.get(&station).into_iter().flatten() {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    seen
}

/// A cut track on a specific segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackCut {
    pub edge: EdgeKey,
    pub track: TrackId,
}

/// Blocked stations and cut tracks describing an incident.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutSet {
    #[serde(default)]
    pub stations: BTreeSet<StationCode>,
    #[serde(default)]
    pub tracks: BTreeSet<TrackCut>,
}

impl CutSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blocked station.
    pub fn block_station(mut self, station: StationCode) -> Self {
        self.stations.insert(station);
        self
    }

    /// Add one cut track.
    pub fn cut_track(mut self, a: StationCode, b: StationCode, track: TrackId) -> Self {
        self.tracks.insert(TrackCut {
            edge: EdgeKey::new(a, b),
            track,
        });
        self
    }

    /// Cut both tracks of a segment.
    pub fn cut_segment(self, a: StationCode, b: StationCode) -> Self {
        self.cut_track(a, b, TrackId::One)
            .cut_track(a, b, TrackId::Two)
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.tracks.is_empty()
    }

    pub fn is_station_blocked(&self, station: &StationCode) -> bool {
        self.stations.contains(station)
    }

    pub fn is_track_cut(&self, edge: &EdgeKey, track: TrackId) -> bool {
        self.tracks.contains(&TrackCut { edge: *edge, track })
    }

    /// Number of cut tracks on a segment (0, 1 or 2).
    pub fn cut_track_count(&self, edge: &EdgeKey) -> usize {
        TrackId::BOTH
            .iter()
            .filter(|t| self.is_track_cut(edge, **t))
            .count()
    }

    /// Both tracks cut.
    pub fn is_edge_impassable(&self, edge: &EdgeKey) -> bool {
        self.cut_track_count(edge) == 2
    }

    /// Exactly one track cut: trains still pass, in single-track working.
    pub fn is_single_track(&self, edge: &EdgeKey) -> bool {
        self.cut_track_count(edge) == 1
    }
}
