//! Per-line unit allocation inside an island.
//!
//! The default allocation is a fixed priority policy: trunk connectors
//! first, then the branch lines' own trains, then the remaining units
//! split over the trunk pairs. Paired lines always move together, so a
//! pair receives or releases units two at a time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{LineCatalog, LineCode, LineRole, StationCode, StationGraph, Unit};

/// Units allocated to each supported line of an island.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    counts: BTreeMap<LineCode, u32>,

    /// Upper bound on the total: min(available trains, available drivers).
    cap: u32,

    /// Paired lines whose sibling is also supported, in both directions.
    #[serde(default)]
    siblings: BTreeMap<LineCode, LineCode>,
}

impl ResourceCounts {
    /// Default allocation for an island.
    ///
    /// `units` are the trains standing inside the island; `drivers` is the
    /// number of drivers available there.
    pub fn default_allocation(
        catalog: &LineCatalog,
        stations: &BTreeSet<StationCode>,
        units: &[&Unit],
        drivers: usize,
    ) -> Self {
        let cap = units.len().min(drivers) as u32;
        let supported: Vec<_> = catalog.supported_by(stations).collect();

        let mut counts: BTreeMap<LineCode, u32> =
            supported.iter().map(|l| (l.code.clone(), 0)).collect();
        let mut siblings = BTreeMap::new();
        for line in &supported {
            if let Some(sibling) = catalog.sibling(&line.code) {
                if counts.contains_key(sibling) {
                    siblings.insert(line.code.clone(), sibling.clone());
                }
            }
        }

        let mut remaining = cap;

        for line in supported
            .iter()
            .filter(|l| l.role == LineRole::TrunkConnector)
        {
            if remaining == 0 {
                break;
            }
            counts.insert(line.code.clone(), 1);
            remaining -= 1;
        }

        for line in supported.iter().filter(|l| l.role == LineRole::Branch) {
            let own = units
                .iter()
                .filter(|u| u.line.as_ref() == Some(&line.code))
                .count() as u32;
            let given = own.min(remaining);
            counts.insert(line.code.clone(), given);
            remaining -= given;
        }

        // Each pair appears once, keyed by whichever sibling comes first in
        // catalog order. Paired lines without a supported sibling take
        // units singly.
        let mut pairs: Vec<(LineCode, LineCode)> = Vec::new();
        let mut singles: Vec<LineCode> = Vec::new();
        for line in &supported {
            if !matches!(line.role, LineRole::Paired { .. }) {
                continue;
            }
            match siblings.get(&line.code) {
                Some(sibling) => {
                    if !pairs.iter().any(|(_, b)| b == &line.code) {
                        pairs.push((line.code.clone(), sibling.clone()));
                    }
                }
                None => singles.push(line.code.clone()),
            }
        }

        loop {
            let mut progressed = false;
            for (a, b) in &pairs {
                if remaining >= 2 {
                    *counts.entry(a.clone()).or_default() += 1;
                    *counts.entry(b.clone()).or_default() += 1;
                    remaining -= 2;
                    progressed = true;
                }
            }
            for line in &singles {
                if remaining >= 1 {
                    *counts.entry(line.clone()).or_default() += 1;
                    remaining -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        debug!(cap, unallocated = remaining, lines = counts.len(), "default allocation");

        Self {
            counts,
            cap,
            siblings,
        }
    }

    pub fn count(&self, line: &LineCode) -> u32 {
        self.counts.get(line).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Lines with at least one unit, in code order.
    pub fn enabled(&self) -> impl Iterator<Item = (&LineCode, u32)> {
        self.counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(line, n)| (line, *n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LineCode, u32)> {
        self.counts.iter().map(|(line, n)| (line, *n))
    }

    /// The sibling of a paired line, when both are supported.
    pub fn sibling(&self, line: &LineCode) -> Option<&LineCode> {
        self.siblings.get(line)
    }

    /// Add one unit to a line (and its sibling). Returns false when the line
    /// is unsupported or the cap would be exceeded.
    pub fn increment(&mut self, line: &LineCode) -> bool {
        if !self.counts.contains_key(line) {
            return false;
        }
        let step = if self.siblings.contains_key(line) { 2 } else { 1 };
        if self.total() + step > self.cap {
            return false;
        }
        self.bump(line, 1);
        true
    }

    /// Remove one unit from a line (and its sibling). Returns false when
    /// there is nothing to remove.
    pub fn decrement(&mut self, line: &LineCode) -> bool {
        if self.count(line) == 0 {
            return false;
        }
        self.bump(line, -1);
        true
    }

    /// Set a line's count, clamped so the total stays within the cap.
    /// Returns the count actually applied.
    pub fn set(&mut self, line: &LineCode, requested: u32) -> u32 {
        if !self.counts.contains_key(line) {
            return 0;
        }
        let sibling = self.siblings.get(line).cloned();
        let others: u32 = self
            .counts
            .iter()
            .filter(|(code, _)| *code != line && Some(*code) != sibling.as_ref())
            .map(|(_, n)| *n)
            .sum();
        let free = self.cap.saturating_sub(others);
        let value = match &sibling {
            Some(_) => requested.min(free / 2),
            None => requested.min(free),
        };

        self.counts.insert(line.clone(), value);
        if let Some(sibling) = sibling {
            self.counts.insert(sibling, value);
        }
        value
    }

    /// Apply manual counts on top of the current allocation.
    ///
    /// Overridden lines are cleared first so a manual increase on one line
    /// can use units released by a manual decrease on another.
    pub fn with_overrides(mut self, overrides: &BTreeMap<LineCode, u32>) -> Self {
        for line in overrides.keys() {
            if self.counts.contains_key(line) {
                self.set(line, 0);
            }
        }
        for (line, requested) in overrides {
            let applied = self.set(line, *requested);
            if applied != *requested {
                debug!(line = %line, requested, applied, "manual count clamped");
            }
        }
        self
    }

    fn bump(&mut self, line: &LineCode, delta: i32) {
        let mut targets = vec![line.clone()];
        if let Some(sibling) = self.siblings.get(line) {
            targets.push(sibling.clone());
        }
        for target in targets {
            if let Some(n) = self.counts.get_mut(&target) {
                *n = n.saturating_add_signed(delta);
            }
        }
    }
}

/// Choose which units serve each enabled line.
///
/// Every line first claims the units already working it. Remaining places
/// are then filled in catalog order with the unclaimed units closest to the
/// line's innermost island station. Ties break on unit id.
pub fn assign_units<'a>(
    counts: &ResourceCounts,
    catalog: &LineCatalog,
    graph: &StationGraph,
    stations: &BTreeSet<StationCode>,
    units: &[&'a Unit],
) -> BTreeMap<LineCode, Vec<&'a Unit>> {
    let mut pool: Vec<&'a Unit> = units.to_vec();
    pool.sort_by(|a, b| a.id.cmp(&b.id));

    let mut assigned: BTreeMap<LineCode, Vec<&'a Unit>> = BTreeMap::new();
    for line in catalog.iter() {
        let wanted = counts.count(&line.code) as usize;
        if wanted == 0 || !line.is_supported_by(stations) {
            continue;
        }
        let taken = assigned.entry(line.code.clone()).or_default();
        pool.retain(|u| {
            if taken.len() < wanted && u.line.as_ref() == Some(&line.code) {
                taken.push(*u);
                false
            } else {
                true
            }
        });
    }

    for line in catalog.iter() {
        let Some(taken) = assigned.get_mut(&line.code) else {
            continue;
        };
        let wanted = counts.count(&line.code) as usize;
        if taken.len() >= wanted {
            continue;
        }
        let Some((inner, _)) = line.endpoints_within(stations) else {
            continue;
        };

        pool.sort_by_key(|u| {
            (
                graph
                    .hop_distance(u.position.station(), inner)
                    .unwrap_or(usize::MAX),
                u.id.clone(),
            )
        });
        let extra = (wanted - taken.len()).min(pool.len());
        taken.extend(pool.drain(..extra));
    }

    assigned
}
