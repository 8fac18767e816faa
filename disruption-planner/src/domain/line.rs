//! Commercial lines and their canonical station lists.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::StationCode;

/// A line identifier such as `S1` or `L7`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineCode(String);

impl LineCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineCode({})", self.0)
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a line takes part in the default allocation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineRole {
    /// A short line feeding the shared trunk; first to receive a unit.
    TrunkConnector,
    /// A branch line served by the trains already standing on it.
    Branch,
    /// One of two lines sharing a trunk. Both siblings always carry the
    /// same number of units when both are enabled.
    Paired { sibling: LineCode },
}

/// A line with its stations in canonical order (innermost first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    pub code: LineCode,
    pub role: LineRole,
    pub stations: Vec<StationCode>,
}

impl LineSpec {
    /// Stations of this line that are present in `stations`, in canonical order.
    pub fn stations_within<'a>(
        &'a self,
        stations: &'a BTreeSet<StationCode>,
    ) -> impl Iterator<Item = StationCode> + 'a {
        self.stations
            .iter()
            .copied()
            .filter(move |s| stations.contains(s))
    }

    /// A line is supported by a station set when at least two of its
    /// canonical stations are present.
    pub fn is_supported_by(&self, stations: &BTreeSet<StationCode>) -> bool {
        self.stations_within(stations).nth(1).is_some()
    }

    /// Innermost and outermost canonical stations present in `stations`.
    ///
    /// Returns `None` if the line is not supported.
    pub fn endpoints_within(
        &self,
        stations: &BTreeSet<StationCode>,
    ) -> Option<(StationCode, StationCode)> {
        let mut present = self.stations_within(stations);
        let inner = present.next()?;
        let outer = present.last()?;
        Some((inner, outer))
    }
}

/// The ordered set of lines the planner knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineCatalog {
    lines: Vec<LineSpec>,
}

impl LineCatalog {
    pub fn new(lines: Vec<LineSpec>) -> Self {
        Self { lines }
    }

    pub fn get(&self, code: &LineCode) -> Option<&LineSpec> {
        self.lines.iter().find(|l| &l.code == code)
    }

    /// Lines in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &LineSpec> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The trunk sibling of a paired line.
    pub fn sibling(&self, code: &LineCode) -> Option<&LineCode> {
        match &self.get(code)?.role {
            LineRole::Paired { sibling } => Some(sibling),
            _ => None,
        }
    }

    /// Lines supported by a station set, in catalog order.
    pub fn supported_by<'a>(
        &'a self,
        stations: &'a BTreeSet<StationCode>,
    ) -> impl Iterator<Item = &'a LineSpec> + 'a {
        self.lines.iter().filter(|l| l.is_supported_by(stations))
    }
}
