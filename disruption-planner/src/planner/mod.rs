//! Disruption planning engine.
//!
//! Four stages answer the questions a dispatcher asks during an incident:
//!
//! - relief: which crews can cover the circulations of an uncovered shift;
//! - partition: which parts of the network are still connected after a cut;
//! - allocation: how many units each line of an isolated island gets;
//! - trips: the replacement shuttle timetable and who drives it.
//!
//! Each stage is a pure function of an immutable request, so rerunning with
//! updated inputs simply supersedes the previous result.

mod allocation;
mod config;
mod engine;
mod partition;
mod relief;
mod request;
mod timeline;
pub mod trips;

pub use allocation::{ResourceCounts, assign_units};
pub use config::{LaborRules, ManeuverSite, PlannerConfig};
pub use engine::{Allocation, Planner, ServicePlan};
pub use partition::{Island, IslandMap, partition};
pub use relief::{CirculationCoverage, CoveragePlan, ReliefCandidate, TravelLogistics, match_relief};
pub use request::{PartitionRequest, PlanningRequest, ReliefRequest};
pub use timeline::{Segment, SegmentKind, ShiftTimeline, analyze_shift};
pub use trips::{Direction, DriverAssignment, Trip, TripGenerator, TripPlan, UnitAssignment};
