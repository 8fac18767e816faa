//! Disruption planner for a suburban rail network.
//!
//! Given a snapshot of shifts, fleet and an incident, answers: "who can
//! cover this uncovered shift?", "which parts of the network still run?",
//! "how many trains go on each line?" and "what is the shuttle timetable,
//! and who drives each trip?"

pub mod domain;
pub mod network;
pub mod planner;
pub mod travel;
pub mod web;
