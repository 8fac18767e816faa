//! Network partitioning under an incident.
//!
//! Each branch grows its island by breadth-first flood fill from its
//! reference terminal over the passable graph. Branch islands are reported
//! as one unified island only when their terminals are joined by a corridor
//! with no blocked station and no cut track; a link in single-track working
//! keeps the stations mutually reachable but the branches separate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::request::PartitionRequest;
use crate::domain::{Branch, EdgeKey, StationCode, StationGraph, Unit, reachable_from};

/// A set of stations reachable from each other after a cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Island {
    /// Branch names joined with `+`, or `zone:<code>` for a stranded zone.
    pub name: String,

    /// Branches whose terminals lie in this island.
    pub branches: Vec<String>,

    pub stations: BTreeSet<StationCode>,

    /// More than one branch converges into this island.
    pub is_unified: bool,

    /// Unaffected units standing at (or heading to) a station of the island.
    pub units: Vec<String>,

    /// Segments inside the island running on a single track.
    pub single_track: Vec<EdgeKey>,
}

impl Island {
    pub fn contains(&self, station: &StationCode) -> bool {
        self.stations.contains(station)
    }

    /// Whether this island is known by `name`, either its own or one of its
    /// branches'.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.branches.iter().any(|b| b == name)
    }

    /// Units whose current station is inside the island.
    pub fn units_within<'a>(&'a self, units: &'a [Unit]) -> impl Iterator<Item = &'a Unit> + 'a {
        units
            .iter()
            .filter(move |u| self.contains(&u.position.station()))
    }
}

/// Result of partitioning the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandMap {
    pub islands: Vec<Island>,

    /// Blocked stations plus any range-selection corridor.
    pub affected_zone: BTreeSet<StationCode>,

    /// Units standing at a blocked station or running on a cut track.
    pub affected_units: Vec<String>,

    /// At least one island unifies several branches.
    pub merged: bool,
}

impl IslandMap {
    /// Look up an island by its name or by one of its branch names.
    pub fn find(&self, name: &str) -> Option<&Island> {
        self.islands
            .iter()
            .find(|i| i.name == name)
            .or_else(|| self.islands.iter().find(|i| i.answers_to(name)))
    }

    pub fn is_affected(&self, station: &StationCode) -> bool {
        self.affected_zone.contains(station)
    }
}

struct Group<'a> {
    branches: Vec<&'a Branch>,
    stations: BTreeSet<StationCode>,
}

/// Partition the network under the request's cuts.
pub fn partition(graph: &StationGraph, request: &PartitionRequest) -> IslandMap {
    let cuts = &request.cuts;
    let passable = graph.adjacency_under(cuts);
    let clean = graph.clean_adjacency_under(cuts);

    let mut groups: Vec<Group> = Vec::new();
    for branch in graph.branches() {
        if cuts.is_station_blocked(&branch.terminal) {
            warn!(branch = %branch.name, terminal = %branch.terminal, "branch terminal is blocked");
            continue;
        }

        let stations = reachable_from(&passable, branch.terminal);
        let clean_reach = reachable_from(&clean, branch.terminal);

        // Clean reachability is an equivalence, so joining the first matching
        // group is enough for transitive merging.
        match groups
            .iter_mut()
            .find(|g| g.branches.iter().any(|b| clean_reach.contains(&b.terminal)))
        {
            Some(group) => {
                group.branches.push(branch);
                group.stations.extend(stations);
            }
            None => groups.push(Group {
                branches: vec![branch],
                stations,
            }),
        }
    }

    let mut islands: Vec<Island> = groups
        .into_iter()
        .map(|g| {
            let names: Vec<String> = g.branches.iter().map(|b| b.name.clone()).collect();
            Island {
                name: names.join("+"),
                is_unified: names.len() > 1,
                branches: names,
                stations: g.stations,
                units: Vec::new(),
                single_track: Vec::new(),
            }
        })
        .collect();

    let mut covered: BTreeSet<StationCode> =
        islands.iter().flat_map(|i| i.stations.iter().copied()).collect();
    for node in graph.stations() {
        if covered.contains(&node.code) || cuts.is_station_blocked(&node.code) {
            continue;
        }
        let stations = reachable_from(&passable, node.code);
        covered.extend(stations.iter().copied());
        islands.push(Island {
            name: format!("zone:{}", node.code),
            branches: Vec::new(),
            stations,
            is_unified: false,
            units: Vec::new(),
            single_track: Vec::new(),
        });
    }

    let mut affected_units = Vec::new();
    for unit in &request.units {
        if unit.position.is_affected_by(cuts) {
            affected_units.push(unit.id.clone());
            continue;
        }
        for island in islands.iter_mut() {
            if island.contains(&unit.position.station()) {
                island.units.push(unit.id.clone());
            }
        }
    }

    for island in islands.iter_mut() {
        island.single_track = graph
            .edges()
            .filter(|e| cuts.is_single_track(e))
            .filter(|e| {
                let (a, b) = e.ends();
                island.contains(&a) && island.contains(&b)
            })
            .copied()
            .collect();
    }

    let mut affected_zone = cuts.stations.clone();
    if request.range_selection && cuts.stations.len() == 2 {
        let mut ends = cuts.stations.iter().copied();
        if let (Some(a), Some(b)) = (ends.next(), ends.next()) {
            match graph.shortest_path(a, b) {
                Some(path) => affected_zone.extend(path),
                None => debug!(from = %a, to = %b, "no corridor between selected stations"),
            }
        }
    }

    let merged = islands.iter().any(|i| i.is_unified);
    debug!(
        islands = islands.len(),
        affected_units = affected_units.len(),
        merged,
        "partitioned network"
    );

    IslandMap {
        islands,
        affected_zone,
        affected_units,
        merged,
    }
}
