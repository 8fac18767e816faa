//! Planner configuration: tolerances, costs and labor rules.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{FgcTime, LineCode, StationCode};

/// Labor rules applied to every driver assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborRules {
    /// Maximum minutes of driving without a break.
    pub max_continuous_drive_mins: i32,

    /// Break inserted when the continuous-drive cap would be exceeded.
    pub min_break_mins: i32,

    /// Length of the single mandatory main break.
    pub main_break_mins: i32,

    /// Start of the main-break window, as a fraction of the shift span.
    pub main_break_window_start: f64,

    /// End of the main-break window, as a fraction of the shift span.
    pub main_break_window_end: f64,

    /// Minutes after shift start a shift may always be extended to.
    pub max_shift_span_mins: i32,
}

impl Default for LaborRules {
    fn default() -> Self {
        Self {
            max_continuous_drive_mins: 180,
            min_break_mins: 15,
            main_break_mins: 20,
            main_break_window_start: 0.35,
            main_break_window_end: 0.65,
            max_shift_span_mins: 525,
        }
    }
}

impl LaborRules {
    /// Latest time a driver may finish: the later of the scheduled end and
    /// the maximum span after the start.
    pub fn extension_limit(&self, shift_start: FgcTime, shift_end: FgcTime) -> FgcTime {
        shift_end.max(shift_start + self.max_shift_span_mins)
    }

    /// Whether `at` lies inside the main-break window of a shift.
    pub fn in_main_break_window(&self, shift_start: FgcTime, shift_end: FgcTime, at: FgcTime) -> bool {
        let span = shift_end.minutes_since(shift_start);
        if span <= 0 {
            return false;
        }
        let elapsed = at.minutes_since(shift_start) as f64 / span as f64;
        (self.main_break_window_start..=self.main_break_window_end).contains(&elapsed)
    }

    pub fn max_continuous_drive(&self) -> Duration {
        Duration::minutes(self.max_continuous_drive_mins as i64)
    }

    pub fn min_break(&self) -> Duration {
        Duration::minutes(self.min_break_mins as i64)
    }

    pub fn main_break(&self) -> Duration {
        Duration::minutes(self.main_break_mins as i64)
    }
}

/// A terminus where trains shunt between trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManeuverSite {
    pub line: LineCode,
    pub terminus: StationCode,
}

/// Configuration parameters for relief matching and trip generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Tolerance when fitting a circulation inside an idle segment (minutes).
    pub relief_tolerance_mins: i32,

    /// Penalty added to a computed headway when part of the route runs on a
    /// single track (minutes).
    pub single_track_penalty_mins: i32,

    /// Fixed cost of a driver changing cab within the same unit (minutes).
    pub cabin_change_mins: i32,

    /// Fixed cost of a driver at the origin taking over another unit (minutes).
    pub unit_swap_mins: i32,

    /// Walking cost per graph hop for a driver positioning on foot or as a
    /// passenger (minutes).
    pub walk_mins_per_hop: i32,

    /// Running time per graph hop for empty or estimated movements (minutes).
    pub run_mins_per_hop: i32,

    /// Duration of each half of a terminus maneuver (minutes).
    pub maneuver_mins: i32,

    /// Termini where trains shunt after arriving.
    pub maneuver_sites: Vec<ManeuverSite>,

    /// Service end assumed when no historical circulation covers a line.
    pub default_service_end: FgcTime,

    pub labor: LaborRules,
}

impl PlannerConfig {
    /// Returns the relief tolerance as a Duration.
    pub fn relief_tolerance(&self) -> Duration {
        Duration::minutes(self.relief_tolerance_mins as i64)
    }

    /// Returns the cabin-change cost as a Duration.
    pub fn cabin_change(&self) -> Duration {
        Duration::minutes(self.cabin_change_mins as i64)
    }

    /// Returns the unit-swap cost as a Duration.
    pub fn unit_swap(&self) -> Duration {
        Duration::minutes(self.unit_swap_mins as i64)
    }

    /// Whether a line shunts at a terminus after arriving there.
    pub fn has_maneuver(&self, line: &LineCode, terminus: &StationCode) -> bool {
        self.maneuver_sites
            .iter()
            .any(|site| &site.line == line && &site.terminus == terminus)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            relief_tolerance_mins: 1,
            single_track_penalty_mins: 5,
            cabin_change_mins: 2,
            unit_swap_mins: 5,
            walk_mins_per_hop: 3,
            run_mins_per_hop: 3,
            maneuver_mins: 4,
            maneuver_sites: Vec::new(),
            default_service_end: FgcTime::from_minutes(1470), // 00:30
            labor: LaborRules::default(),
        }
    }
}
