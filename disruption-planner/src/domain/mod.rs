//! Domain types for the disruption planner.
//!
//! This module contains the snapshot data the planner reasons over:
//! FGC-day times, station and line codes, shifts and circulations, the
//! station graph with its cut set, and the fleet on duty. Types enforce
//! their invariants at construction time, so planning code that receives
//! them can trust their validity.

mod error;
mod fleet;
mod line;
mod network;
mod shift;
mod station;
pub(crate) mod time;

pub use error::DomainError;
pub use fleet::{DutyTimes, OnDutyDriver, TrainPosition, Unit};
pub use line::{LineCatalog, LineCode, LineRole, LineSpec};
pub use network::{
    Adjacency, Branch, CutSet, EdgeKey, StationGraph, StationNode, TrackCut, TrackId,
    reachable_from, shortest_path,
};
pub use shift::{
    Circulation, CirculationIndex, CirculationRef, DailyAssignment, Phonebook, Shift, Stop,
};
pub use station::{InvalidStationCode, StationCode};
pub use time::{FgcTime, MINUTES_PER_DAY, TimeError, to_hhmm, to_minutes};
