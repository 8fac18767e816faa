//! Running times, headways and service end per line.

use std::collections::BTreeSet;

use crate::domain::{Circulation, CutSet, EdgeKey, FgcTime, LineCode, StationCode};

/// Average endpoint-to-endpoint running time observed on a line, in either
/// direction, rounded up. `None` without a usable sample.
pub fn observed_running_minutes(
    history: &[Circulation],
    line: &LineCode,
    inner: StationCode,
    outer: StationCode,
) -> Option<i32> {
    let samples: Vec<i32> = history
        .iter()
        .filter(|c| &c.line == line)
        .filter_map(|c| {
            let a = c.time_at(&inner)?;
            let b = c.time_at(&outer)?;
            Some(b.minutes_since(a).abs())
        })
        .filter(|minutes| *minutes > 0)
        .collect();

    if samples.is_empty() {
        return None;
    }
    let total: i32 = samples.iter().sum();
    Some(ceil_div(total, samples.len() as i32))
}

/// Latest time any historical circulation of the line calls at a station of
/// the island.
pub fn observed_service_end(
    history: &[Circulation],
    line: &LineCode,
    stations: &BTreeSet<StationCode>,
) -> Option<FgcTime> {
    history
        .iter()
        .filter(|c| &c.line == line)
        .flat_map(|c| c.timed_calls())
        .filter(|(station, _)| stations.contains(station))
        .map(|(_, time)| time)
        .max()
}

/// Whether any segment of a route runs in single-track working.
pub fn route_has_single_track(route: &[StationCode], cuts: &CutSet) -> bool {
    route
        .windows(2)
        .any(|w| cuts.is_single_track(&EdgeKey::new(w[0], w[1])))
}

/// `ceil(running / units)`, plus the penalty on single track. Never below
/// one minute.
pub fn computed_headway(running_mins: i32, units: u32, single_track: bool, penalty: i32) -> i32 {
    let units = units.max(1) as i32;
    let base = ceil_div(running_mins.max(0), units);
    let headway = if single_track { base + penalty } else { base };
    headway.max(1)
}

fn ceil_div(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}
