//! Data transfer objects for web requests and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{LineCode, LineRole};
use crate::network::NetworkModel;
use crate::planner::{CoveragePlan, IslandMap, PlanningRequest, ResourceCounts, TripPlan};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stations: usize,
    pub lines: usize,
}

/// A station in the network summary.
#[derive(Debug, Serialize)]
pub struct StationResult {
    /// Station code (e.g., "SR")
    pub code: String,

    /// Display name
    pub name: String,

    /// Whether trains can be stabled here
    pub is_depot: bool,
}

/// A line in the network summary.
#[derive(Debug, Serialize)]
pub struct LineResult {
    pub code: String,
    pub role: LineRole,

    /// Canonical station codes, innermost first
    pub stations: Vec<String>,
}

/// Response for the network summary.
#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub stations: Vec<StationResult>,

    /// Segments as pairs of station codes
    pub edges: Vec<(String, String)>,

    /// Branch name to reference terminal
    pub branches: BTreeMap<String, String>,

    pub lines: Vec<LineResult>,
}

impl NetworkResponse {
    /// Create from a network model.
    pub fn from_model(model: &NetworkModel) -> Self {
        let stations = model
            .graph
            .stations()
            .map(|s| StationResult {
                code: s.code.to_string(),
                name: s.name.clone(),
                is_depot: s.is_depot,
            })
            .collect();

        let edges = model
            .graph
            .edges()
            .map(|e| {
                let (a, b) = e.ends();
                (a.to_string(), b.to_string())
            })
            .collect();

        let branches = model
            .graph
            .branches()
            .iter()
            .map(|b| (b.name.clone(), b.terminal.to_string()))
            .collect();

        let lines = model
            .lines
            .iter()
            .map(|l| LineResult {
                code: l.code.to_string(),
                role: l.role.clone(),
                stations: l.stations.iter().map(|s| s.to_string()).collect(),
            })
            .collect();

        Self {
            stations,
            edges,
            branches,
            lines,
        }
    }
}

/// Response for relief matching.
#[derive(Debug, Serialize)]
pub struct ReliefResponse {
    /// Circulations with no candidate, needing escalation
    pub uncovered_ids: Vec<String>,

    #[serde(flatten)]
    pub plan: CoveragePlan,
}

impl ReliefResponse {
    pub fn from_plan(plan: CoveragePlan) -> Self {
        let uncovered_ids = plan
            .circulations
            .iter()
            .filter(|c| !c.is_covered())
            .map(|c| c.circulation_id.clone())
            .collect();
        Self {
            uncovered_ids,
            plan,
        }
    }
}

/// Response for network partitioning.
#[derive(Debug, Serialize)]
pub struct IslandsResponse {
    /// Island names, in report order
    pub names: Vec<String>,

    #[serde(flatten)]
    pub map: IslandMap,
}

impl IslandsResponse {
    pub fn from_map(map: IslandMap) -> Self {
        Self {
            names: map.islands.iter().map(|i| i.name.clone()).collect(),
            map,
        }
    }
}

/// Direction of a manual allocation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustStep {
    Increment,
    Decrement,
}

/// Request to nudge one line's unit count.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub planning: PlanningRequest,
    pub line: LineCode,
    pub step: AdjustStep,
}

/// Response for allocation requests.
#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub island: String,
    pub stations: Vec<String>,
    pub counts: ResourceCounts,
    pub total: u32,
    pub cap: u32,

    /// Whether a requested adjustment was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted: Option<bool>,
}

impl AllocationResponse {
    pub fn new(island: &crate::planner::Island, counts: ResourceCounts) -> Self {
        Self {
            island: island.name.clone(),
            stations: island.stations.iter().map(|s| s.to_string()).collect(),
            total: counts.total(),
            cap: counts.cap(),
            counts,
            adjusted: None,
        }
    }
}

/// Response for trip generation.
#[derive(Debug, Serialize)]
pub struct TripsResponse {
    pub island: String,
    pub counts: ResourceCounts,

    #[serde(flatten)]
    pub plan: TripPlan,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
