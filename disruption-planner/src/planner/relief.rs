//! Relief matching for an uncovered shift.
//!
//! For every circulation of the uncovered shift, look through the other
//! shifts for an idle segment that contains the circulation, then check the
//! relief crew can get from where they are idling to the departure station
//! in time, and from the arrival station back to their next task in time.
//! A circulation with no candidate is a normal outcome that calls for a
//! human decision.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Circulation, CirculationIndex, FgcTime, LineCode, Shift, StationCode};
use crate::travel::TravelLookup;

use super::config::PlannerConfig;
use super::request::ReliefRequest;
use super::timeline::{Segment, ShiftTimeline, analyze_shift};

/// How a relief crew gets to and from the circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelLogistics {
    /// Where the crew is idling.
    pub from: StationCode,
    pub minutes_to_origin: i32,
    pub arrival_at_origin: FgcTime,
    /// Where the crew must be when the idle segment ends.
    pub exit_location: StationCode,
    pub minutes_to_exit: i32,
    pub arrival_at_next_task: FgcTime,
}

/// A shift that can take over one circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReliefCandidate {
    pub shift_id: String,
    pub driver_id: Option<String>,
    pub contacts: Vec<String>,
    pub idle_segment: Segment,
    /// Minutes between reaching the origin and departure.
    pub margin_before: i32,
    /// Minutes between reaching the next task and the end of the idle segment.
    pub margin_after: i32,
    pub travel: TravelLogistics,
}

impl ReliefCandidate {
    pub fn total_margin(&self) -> i32 {
        self.margin_before + self.margin_after
    }
}

/// Candidates for one circulation, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CirculationCoverage {
    pub circulation_id: String,
    pub line: LineCode,
    pub origin: StationCode,
    pub destination: StationCode,
    pub departure: Option<FgcTime>,
    pub arrival: Option<FgcTime>,
    pub candidates: Vec<ReliefCandidate>,
}

impl CirculationCoverage {
    pub fn is_covered(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Relief options for every circulation of one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveragePlan {
    pub target_shift: String,
    pub circulations: Vec<CirculationCoverage>,
    pub covered: usize,
    pub uncovered: usize,
}

impl CoveragePlan {
    /// Nothing to show: the shift is unknown or has no circulations.
    pub fn empty(target_shift: impl Into<String>) -> Self {
        Self {
            target_shift: target_shift.into(),
            circulations: Vec::new(),
            covered: 0,
            uncovered: 0,
        }
    }
}

/// A candidate shift with its timeline and roster details.
struct Pool<'a> {
    shift: &'a Shift,
    timeline: ShiftTimeline,
    driver_id: Option<&'a str>,
}

/// Find relief candidates for every circulation of the target shift.
///
/// Passenger transfers in the target shift are not covered: they only
/// reposition the original crew. An unknown target shift yields an empty
/// plan.
pub fn match_relief<T: TravelLookup>(
    request: &ReliefRequest,
    travel: &T,
    config: &PlannerConfig,
) -> CoveragePlan {
    let Some(target) = request.shifts.iter().find(|s| s.id == request.target_shift) else {
        debug!(shift = %request.target_shift, "Target shift not found");
        return CoveragePlan::empty(&request.target_shift);
    };

    let circulations = CirculationIndex::new(request.circulations.iter().cloned());
    let pool = candidate_pool(request, target, &circulations);

    let mut plan = CoveragePlan::empty(&target.id);
    for reference in target.circulations.iter().filter(|r| !r.is_passenger_transfer()) {
        let Some(circulation) = reference.resolve(&circulations) else {
            debug!(
                shift = %target.id,
                circulation = reference.circulation_id(),
                "Unknown circulation in target shift"
            );
            continue;
        };

        let candidates = match circulation.times() {
            Some(_) => candidates_for(&circulation, &pool, request, travel, config),
            None => Vec::new(),
        };

        debug!(
            circulation = %circulation.id,
            candidates = candidates.len(),
            "Relief candidates found"
        );

        plan.circulations.push(CirculationCoverage {
            circulation_id: circulation.id.clone(),
            line: circulation.line.clone(),
            origin: circulation.origin,
            destination: circulation.destination,
            departure: circulation.departure,
            arrival: circulation.arrival,
            candidates,
        });
    }

    plan.covered = plan.circulations.iter().filter(|c| c.is_covered()).count();
    plan.uncovered = plan.circulations.len() - plan.covered;

    info!(
        shift = %plan.target_shift,
        covered = plan.covered,
        uncovered = plan.uncovered,
        "Relief matching complete"
    );
    plan
}

/// Shifts eligible to provide relief, with their timelines.
fn candidate_pool<'a>(
    request: &'a ReliefRequest,
    target: &Shift,
    circulations: &CirculationIndex,
) -> Vec<Pool<'a>> {
    let default_services = BTreeSet::from([target.service_code.clone()]);
    let services = request.active_services.as_ref().unwrap_or(&default_services);

    let drivers: HashMap<&str, &str> = request
        .roster
        .iter()
        .map(|a| (a.shift_id.as_str(), a.driver_id.as_str()))
        .collect();

    request
        .shifts
        .iter()
        .filter(|s| s.id != target.id)
        .filter(|s| services.contains(&s.service_code))
        .filter(|s| {
            request.include_unavailable_reserves || !request.unavailable_reserves.contains(&s.id)
        })
        .filter_map(|shift| {
            let timeline = analyze_shift(shift, circulations)?;
            Some(Pool {
                shift,
                timeline,
                driver_id: drivers.get(shift.id.as_str()).copied(),
            })
        })
        .collect()
}

fn candidates_for<T: TravelLookup>(
    circulation: &Circulation,
    pool: &[Pool<'_>],
    request: &ReliefRequest,
    travel: &T,
    config: &PlannerConfig,
) -> Vec<ReliefCandidate> {
    let mut candidates: Vec<ReliefCandidate> = pool
        .iter()
        .filter_map(|entry| best_fit(circulation, entry, request, travel, config))
        .collect();

    candidates.sort_by(|a, b| {
        b.total_margin()
            .cmp(&a.total_margin())
            .then_with(|| a.shift_id.cmp(&b.shift_id))
    });
    candidates
}

/// The best feasible idle segment of one shift for a circulation.
fn best_fit<T: TravelLookup>(
    circulation: &Circulation,
    entry: &Pool<'_>,
    request: &ReliefRequest,
    travel: &T,
    config: &PlannerConfig,
) -> Option<ReliefCandidate> {
    let (departure, arrival) = circulation.times()?;
    let tolerance = config.relief_tolerance();

    entry
        .timeline
        .idle_segments()
        .filter(|(_, gap)| gap.start <= departure + tolerance && gap.end >= arrival - tolerance)
        .filter_map(|(index, gap)| {
            let logistics = logistics(circulation, &entry.timeline, index, gap, travel)?;
            let margin_before = departure.minutes_since(logistics.arrival_at_origin);
            let margin_after = gap.end.minutes_since(logistics.arrival_at_next_task);
            let driver_id = entry.driver_id.map(str::to_string);
            let contacts = driver_id
                .as_ref()
                .and_then(|id| request.phonebook.get(id))
                .cloned()
                .unwrap_or_default();

            Some(ReliefCandidate {
                shift_id: entry.shift.id.clone(),
                driver_id,
                contacts,
                idle_segment: gap.clone(),
                margin_before,
                margin_after,
                travel: logistics,
            })
        })
        .max_by_key(|c| c.total_margin())
}

/// Travel to and from the circulation, or `None` if the crew cannot make it.
///
/// A crew that has to travel must arrive a minute early; a crew already in
/// place may arrive exactly on time.
fn logistics<T: TravelLookup>(
    circulation: &Circulation,
    timeline: &ShiftTimeline,
    index: usize,
    gap: &Segment,
    travel: &T,
) -> Option<TravelLogistics> {
    let (departure, arrival) = circulation.times()?;

    let minutes_to_origin = travel.minutes(gap.location, circulation.origin);
    let arrival_at_origin = gap.start + minutes_to_origin;
    let latest_at_origin = if minutes_to_origin > 0 {
        departure - 1
    } else {
        departure
    };
    if arrival_at_origin > latest_at_origin {
        return None;
    }

    let exit_location = timeline.exit_location(index);
    let minutes_to_exit = travel.minutes(circulation.destination, exit_location);
    let arrival_at_next_task = arrival + minutes_to_exit;
    let latest_at_exit = if minutes_to_exit > 0 {
        gap.end - 1
    } else {
        gap.end
    };
    if arrival_at_next_task > latest_at_exit {
        return None;
    }

    Some(TravelLogistics {
        from: gap.location,
        minutes_to_origin,
        arrival_at_origin,
        exit_location,
        minutes_to_exit,
        arrival_at_next_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CirculationRef, DailyAssignment};
    use crate::travel::{TravelTimes, TravelTimesBuilder};

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn t(s: &str) -> FgcTime {
        FgcTime::parse_hhmm(s).unwrap()
    }

    fn circ(id: &str, from: &str, to: &str, dep: &str, arr: &str) -> Circulation {
        Circulation {
            id: id.into(),
            line: LineCode::new("S1"),
            origin: code(from),
            destination: code(to),
            departure: FgcTime::parse_hhmm(dep).ok(),
            arrival: FgcTime::parse_hhmm(arr).ok(),
            stops: vec![],
            tracks: vec![],
        }
    }

    fn shift(id: &str, depot: &str, refs: &[&str]) -> Shift {
        Shift {
            id: id.into(),
            service_code: "LAB".into(),
            start: Some(t("06:00")),
            end: Some(t("14:00")),
            home_depot: code(depot),
            circulations: refs
                .iter()
                .map(|id| CirculationRef::Direct { id: (*id).into() })
                .collect(),
        }
    }

    /// Q101 needs A001 X->Y at 10:00-10:40. Q102 idles at X from 09:30 to
    /// 11:00 between B1 (ending at X) and B2 (starting at X).
    fn example() -> ReliefRequest {
        ReliefRequest {
            target_shift: "Q101".into(),
            shifts: vec![
                shift("Q101", "X", &["A001"]),
                shift("Q102", "X", &["B1", "B2"]),
            ],
            circulations: vec![
                circ("A001", "X", "Y", "10:00", "10:40"),
                circ("B1", "Y", "X", "09:00", "09:30"),
                circ("B2", "X", "Y", "11:00", "11:30"),
            ],
            ..ReliefRequest::default()
        }
    }

    fn table() -> TravelTimes {
        TravelTimesBuilder::new().add("X", "Y", 15).build()
    }

    #[test]
    fn example_candidate_margins() {
        let plan = match_relief(&example(), &table(), &PlannerConfig::default());

        assert_eq!(plan.covered, 1);
        assert_eq!(plan.uncovered, 0);
        let coverage = &plan.circulations[0];
        assert_eq!(coverage.circulation_id, "A001");
        let candidate = &coverage.candidates[0];
        assert_eq!(candidate.shift_id, "Q102");
        assert_eq!(candidate.margin_before, 30);
        // back from Y to X takes 15: 10:55, idle ends 11:00
        assert_eq!(candidate.margin_after, 5);
        assert_eq!(candidate.travel.exit_location, code("X"));
        assert_eq!(candidate.idle_segment.start, t("09:30"));
    }

    #[test]
    fn reserve_shift_competes_and_ranks_by_margin() {
        let mut request = example();
        request.shifts.push(shift("R1", "X", &[]));
        let plan = match_relief(&request, &table(), &PlannerConfig::default());

        let ids: Vec<_> = plan.circulations[0]
            .candidates
            .iter()
            .map(|c| c.shift_id.as_str())
            .collect();
        // The reserve idles all day and returns to X: far more slack.
        assert_eq!(ids, vec!["R1", "Q102"]);
    }

    #[test]
    fn travel_must_leave_a_minute() {
        let mut request = example();
        // Idle at Y from 09:30; reaching X needs 15 minutes -> 09:45, fine.
        request.circulations[1] = circ("B1", "X", "Y", "09:00", "09:30");
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        let candidate = &plan.circulations[0].candidates[0];
        assert_eq!(candidate.travel.minutes_to_origin, 15);
        assert_eq!(candidate.margin_before, 15);

        // 30 minutes of travel lands at 10:00, which is too late by a minute.
        let slow = TravelTimesBuilder::new().add("X", "Y", 30).build();
        let plan = match_relief(&request, &slow, &PlannerConfig::default());
        assert_eq!(plan.uncovered, 1);
        assert!(plan.circulations[0].candidates.is_empty());
    }

    #[test]
    fn tolerance_admits_gap_ending_a_minute_early() {
        let mut request = example();
        // Idle segment now ends at 10:39, inside the one-minute tolerance,
        // but the return leg still has to fit.
        request.circulations[2] = circ("B2", "Y", "X", "10:39", "11:00");
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert!(plan.circulations[0].candidates.is_empty());

        let zero = TravelTimesBuilder::new().add("X", "Y", 0).build();
        request.circulations[2] = circ("B2", "Y", "X", "10:40", "11:00");
        let plan = match_relief(&request, &zero, &PlannerConfig::default());
        let candidate = &plan.circulations[0].candidates[0];
        assert_eq!(candidate.margin_after, 0);
    }

    #[test]
    fn unknown_target_is_empty() {
        let mut request = example();
        request.target_shift = "NOPE".into();
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan, CoveragePlan::empty("NOPE"));
    }

    #[test]
    fn service_filter_and_unavailable_reserves() {
        let mut request = example();
        request.shifts[1].service_code = "FEST".into();
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.uncovered, 1);

        request.active_services = Some(BTreeSet::from(["LAB".into(), "FEST".into()]));
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.covered, 1);

        request.unavailable_reserves.insert("Q102".into());
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.covered, 0);

        request.include_unavailable_reserves = true;
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.covered, 1);
    }

    #[test]
    fn roster_and_phonebook_enrich_candidates() {
        let mut request = example();
        request.roster.push(DailyAssignment {
            shift_id: "Q102".into(),
            driver_id: "D7".into(),
        });
        request
            .phonebook
            .insert("D7".into(), vec!["600000000".into()]);
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        let candidate = &plan.circulations[0].candidates[0];
        assert_eq!(candidate.driver_id.as_deref(), Some("D7"));
        assert_eq!(candidate.contacts, vec!["600000000".to_string()]);
    }

    #[test]
    fn malformed_circulation_is_reported_uncovered() {
        let mut request = example();
        request.circulations[0].departure = None;
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.circulations.len(), 1);
        assert_eq!(plan.uncovered, 1);
    }

    #[test]
    fn passenger_transfers_need_no_relief() {
        let mut request = example();
        request.shifts[0].circulations.push(CirculationRef::PassengerTransfer {
            real_id: "B2".into(),
            origin: None,
            destination: None,
        });
        let plan = match_relief(&request, &table(), &PlannerConfig::default());
        assert_eq!(plan.circulations.len(), 1);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::CirculationRef;
    use crate::travel::TravelTimesBuilder;
    use proptest::prelude::*;

    const STATIONS: [&str; 4] = ["PC", "SR", "SC", "NA"];

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn run_strategy() -> impl Strategy<Value = (usize, usize, i32, i32)> {
        (0usize..4, 0usize..4, 360i32..800, 5i32..90)
    }

    proptest! {
        /// Every returned candidate has non-negative margins on both sides.
        #[test]
        fn margins_never_negative(
            target in run_strategy(),
            others in prop::collection::vec(prop::collection::vec(run_strategy(), 0..4), 1..6),
            minutes in prop::collection::vec(0i32..40, 6),
        ) {
            let travel = TravelTimesBuilder::new()
                .add("PC", "SR", minutes[0])
                .add("PC", "SC", minutes[1])
                .add("PC", "NA", minutes[2])
                .add("SR", "SC", minutes[3])
                .add("SR", "NA", minutes[4])
                .add("SC", "NA", minutes[5])
                .build();

            let mut circulations = Vec::new();
            let mut shifts = Vec::new();
            let mut push = |id: String, runs: &[(usize, usize, i32, i32)]| {
                let mut refs = Vec::new();
                for (n, (from, to, dep, dur)) in runs.iter().enumerate() {
                    let cid = format!("{id}-{n}");
                    circulations.push(Circulation {
                        id: cid.clone(),
                        line: LineCode::new("S1"),
                        origin: code(STATIONS[*from]),
                        destination: code(STATIONS[*to]),
                        departure: Some(FgcTime::from_minutes(*dep)),
                        arrival: Some(FgcTime::from_minutes(dep + dur)),
                        stops: vec![],
                        tracks: vec![],
                    });
                    refs.push(CirculationRef::Direct { id: cid });
                }
                shifts.push(Shift {
                    id,
                    service_code: "LAB".into(),
                    start: Some(FgcTime::from_minutes(330)),
                    end: Some(FgcTime::from_minutes(900)),
                    home_depot: code("PC"),
                    circulations: refs,
                });
            };
            push("T".into(), &[target]);
            for (i, runs) in others.iter().enumerate() {
                push(format!("S{i}"), runs);
            }

            let request = ReliefRequest {
                target_shift: "T".into(),
                shifts,
                circulations,
                ..ReliefRequest::default()
            };
            let plan = match_relief(&request, &travel, &PlannerConfig::default());
            for coverage in &plan.circulations {
                for candidate in &coverage.candidates {
                    prop_assert!(candidate.margin_before >= 0);
                    prop_assert!(candidate.margin_after >= 0);
                }
                for pair in coverage.candidates.windows(2) {
                    prop_assert!(pair[0].total_margin() >= pair[1].total_margin());
                }
            }
        }
    }
}
