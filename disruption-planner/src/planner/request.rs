//! Immutable planning requests.
//!
//! Each request bundles the full snapshot one planning call needs. The
//! planner functions take these by reference and never keep state between
//! calls, so a newer request simply supersedes an older one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{
    Circulation, CutSet, DailyAssignment, FgcTime, LineCode, OnDutyDriver, Phonebook, Shift, Unit,
};

/// Find relief crews for an uncovered shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReliefRequest {
    /// The shift whose circulations need covering.
    pub target_shift: String,

    /// Every shift active today, the target included.
    pub shifts: Vec<Shift>,

    /// Circulation reference data.
    pub circulations: Vec<Circulation>,

    /// Which driver works which shift.
    #[serde(default)]
    pub roster: Vec<DailyAssignment>,

    #[serde(default)]
    pub phonebook: Phonebook,

    /// Service codes whose shifts may provide relief. Defaults to the
    /// target shift's own service code.
    #[serde(default)]
    pub active_services: Option<BTreeSet<String>>,

    /// Reserve shifts known to be unavailable.
    #[serde(default)]
    pub unavailable_reserves: BTreeSet<String>,

    /// Consider the unavailable reserves anyway.
    #[serde(default)]
    pub include_unavailable_reserves: bool,
}

/// Partition the network under an incident.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionRequest {
    pub cuts: CutSet,

    /// Units on the network, used to flag the ones caught by the incident.
    #[serde(default)]
    pub units: Vec<Unit>,

    /// Treat two individually selected stations as the ends of an affected
    /// corridor.
    #[serde(default)]
    pub range_selection: bool,
}

/// Allocate units to lines inside one island and generate its shuttle
/// timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub cuts: CutSet,

    /// Island to plan for, by name as reported by the partitioner.
    pub island: String,

    /// Units on the network; only those inside the island are used.
    pub units: Vec<Unit>,

    /// Drivers on duty; only those inside the island are used.
    pub drivers: Vec<OnDutyDriver>,

    /// Planning clock.
    pub now: FgcTime,

    /// Historical circulations used to estimate running times and the end
    /// of service.
    #[serde(default)]
    pub history: Vec<Circulation>,

    /// Manual per-line unit counts; lines not listed use the default
    /// allocation.
    #[serde(default)]
    pub counts: Option<BTreeMap<LineCode, u32>>,

    /// Manual per-line headways in minutes.
    #[serde(default)]
    pub headways: BTreeMap<LineCode, i32>,
}

