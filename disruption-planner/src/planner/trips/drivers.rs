//! Driver workspace for one generation run.
//!
//! Candidates for a trip are tried in three tiers: the driver already in
//! the unit's cab, then any driver standing at the origin, then a driver
//! who can still walk there because they have not driven yet. Each tier is
//! checked against the labor rules and the shift extension limit before
//! falling through to the next.

use std::cmp::Ordering;

use chrono::Duration;
use tracing::trace;

use crate::domain::{Adjacency, FgcTime, OnDutyDriver, StationCode, shortest_path};
use crate::planner::config::PlannerConfig;
use crate::travel::TravelLookup;

/// Mutable state of one driver during generation.
#[derive(Debug, Clone)]
pub(super) struct DriverState {
    pub id: String,
    pub location: StationCode,
    pub available: FgcTime,
    pub shift_start: FgcTime,
    pub shift_end: FgcTime,
    pub home_depot: StationCode,
    /// Unit whose cab the driver is in.
    pub unit: Option<String>,
    pub trips_done: u32,
    pub continuous_mins: i32,
    pub main_break_taken: bool,
}

impl DriverState {
    fn from_snapshot(driver: &OnDutyDriver, now: FgcTime) -> Option<Self> {
        let times = driver.duty_times()?;
        Some(Self {
            id: driver.id.clone(),
            location: driver.current_station,
            available: times.available_from.max(now),
            shift_start: times.shift_start,
            shift_end: times.shift_end,
            home_depot: driver.home_depot,
            unit: driver.bound_unit.clone(),
            trips_done: 0,
            continuous_mins: 0,
            main_break_taken: false,
        })
    }
}

/// How a driver reaches the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Handover {
    CabinChange,
    UnitSwap,
    Walk { hops: usize },
}

/// A trip the pool is asked to crew.
#[derive(Debug, Clone)]
pub(super) struct Demand<'a> {
    pub unit: &'a str,
    pub origin: StationCode,
    pub destination: StationCode,
    /// Earliest start allowed by the slot, the unit and the headway.
    pub earliest: FgcTime,
    pub running_mins: i32,
}

/// A feasible choice of driver with the resulting start time.
#[derive(Debug, Clone, Copy)]
pub(super) struct Selection {
    index: usize,
    pub start: FgcTime,
    pub handover: Handover,
    main_break: bool,
    rest_break: bool,
}

pub(super) struct DriverPool<'a, T> {
    drivers: Vec<DriverState>,
    adjacency: &'a Adjacency,
    travel: &'a T,
    config: &'a PlannerConfig,
}

impl<'a, T: TravelLookup> DriverPool<'a, T> {
    pub fn new(
        drivers: &[&OnDutyDriver],
        now: FgcTime,
        adjacency: &'a Adjacency,
        travel: &'a T,
        config: &'a PlannerConfig,
    ) -> Self {
        let mut drivers: Vec<DriverState> = drivers
            .iter()
            .filter_map(|d| DriverState::from_snapshot(d, now))
            .collect();
        drivers.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            drivers,
            adjacency,
            travel,
            config,
        }
    }

    pub fn id(&self, selection: &Selection) -> &str {
        &self.drivers[selection.index].id
    }

    /// Move the driver bound to a unit along with it while it positions.
    pub fn follow_unit(&mut self, unit: &str, location: StationCode, ready: FgcTime) {
        for driver in self.drivers.iter_mut() {
            if driver.unit.as_deref() == Some(unit) {
                driver.location = location;
                driver.available = driver.available.max(ready);
            }
        }
    }

    /// Best feasible driver for a trip, by tier.
    pub fn select(&self, demand: &Demand) -> Option<Selection> {
        let bound = self
            .drivers
            .iter()
            .enumerate()
            .filter(|(_, d)| d.unit.as_deref() == Some(demand.unit) && d.location == demand.origin)
            .filter_map(|(i, d)| {
                let ready = d.available + self.config.cabin_change();
                self.evaluate(i, ready, Handover::CabinChange, demand)
            })
            .min_by(by_start);
        if bound.is_some() {
            return bound;
        }

        let at_origin = self
            .drivers
            .iter()
            .enumerate()
            .filter(|(_, d)| d.location == demand.origin)
            .filter_map(|(i, d)| {
                let ready = d.available + self.config.unit_swap();
                self.evaluate(i, ready, Handover::UnitSwap, demand)
            })
            .min_by(by_start);
        if at_origin.is_some() {
            return at_origin;
        }

        self.drivers
            .iter()
            .enumerate()
            .filter(|(_, d)| d.trips_done == 0 && d.location != demand.origin)
            .filter_map(|(i, d)| {
                let hops = shortest_path(self.adjacency, d.location, demand.origin)?.len() - 1;
                let ready = d.available + hops as i32 * self.config.walk_mins_per_hop;
                self.evaluate(i, ready, Handover::Walk { hops }, demand)
            })
            .min_by(|a, b| walk_hops(a).cmp(&walk_hops(b)).then_with(|| by_start(a, b)))
    }

    /// Apply break rules and the extension limit to one candidate.
    fn evaluate(
        &self,
        index: usize,
        ready: FgcTime,
        handover: Handover,
        demand: &Demand,
    ) -> Option<Selection> {
        let driver = &self.drivers[index];
        let labor = &self.config.labor;

        let mut start = demand.earliest.max(ready);
        let mut continuous = driver.continuous_mins;
        let mut main_break = false;
        let mut rest_break = false;

        if !driver.main_break_taken
            && labor.in_main_break_window(driver.shift_start, driver.shift_end, start)
        {
            start = start + labor.main_break();
            main_break = true;
            continuous = 0;
        }
        let driving = Duration::minutes((continuous + demand.running_mins) as i64);
        if driving > labor.max_continuous_drive() {
            start = start + labor.min_break();
            rest_break = true;
        }

        let end = start + demand.running_mins;
        let back_home = self.travel.minutes(demand.destination, driver.home_depot);
        let limit = labor.extension_limit(driver.shift_start, driver.shift_end);
        if end + back_home > limit {
            trace!(driver = %driver.id, %end, %limit, "driver would exceed shift limit");
            return None;
        }

        Some(Selection {
            index,
            start,
            handover,
            main_break,
            rest_break,
        })
    }

    /// Record a trip against the chosen driver. Returns its end time.
    pub fn commit(&mut self, selection: &Selection, demand: &Demand) -> FgcTime {
        for other in self.drivers.iter_mut() {
            if other.unit.as_deref() == Some(demand.unit) {
                other.unit = None;
            }
        }

        let end = selection.start + demand.running_mins;
        let driver = &mut self.drivers[selection.index];
        if selection.main_break || selection.rest_break {
            driver.continuous_mins = 0;
        }
        driver.main_break_taken |= selection.main_break;
        driver.continuous_mins += demand.running_mins;
        driver.location = demand.destination;
        driver.available = end;
        driver.unit = Some(demand.unit.to_string());
        driver.trips_done += 1;
        end
    }

    /// Keep a driver busy for extra minutes in the cab, e.g. a maneuver.
    pub fn extend(&mut self, selection: &Selection, minutes: i32) {
        let driver = &mut self.drivers[selection.index];
        driver.available = driver.available + minutes;
        driver.continuous_mins += minutes;
    }

    /// Crew a retirement run with the unit's own driver, if the depot is
    /// their home and the run fits their limit. Returns the driver id and
    /// the start time.
    pub fn retire(
        &mut self,
        unit: &str,
        depot: StationCode,
        departure: FgcTime,
        running_mins: i32,
    ) -> Option<(String, FgcTime)> {
        let labor = &self.config.labor;
        let driver = self
            .drivers
            .iter_mut()
            .find(|d| d.unit.as_deref() == Some(unit))?;
        if driver.home_depot != depot {
            return None;
        }

        let start = departure.max(driver.available);
        let end = start + running_mins;
        if end > labor.extension_limit(driver.shift_start, driver.shift_end) {
            return None;
        }

        driver.location = depot;
        driver.available = end;
        driver.unit = None;
        Some((driver.id.clone(), start))
    }
}

fn by_start(a: &Selection, b: &Selection) -> Ordering {
    a.start.cmp(&b.start).then(a.index.cmp(&b.index))
}

fn walk_hops(selection: &Selection) -> usize {
    match selection.handover {
        Handover::Walk { hops } => hops,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CutSet, EdgeKey, StationGraph, StationNode};
    use crate::travel::TravelTimes;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn t(s: &str) -> FgcTime {
        FgcTime::parse_hhmm(s).unwrap()
    }

    fn graph() -> StationGraph {
        let nodes = ["PC", "GR", "SR", "TT"]
            .iter()
            .map(|c| StationNode {
                code: code(c),
                name: String::new(),
                is_depot: false,
            })
            .collect();
        let edges = [("PC", "GR"), ("GR", "SR"), ("SR", "TT")]
            .iter()
            .map(|(a, b)| EdgeKey::new(code(a), code(b)))
            .collect();
        StationGraph::new(nodes, edges, vec![]).unwrap()
    }

    fn driver(id: &str, at: &str, unit: Option<&str>) -> OnDutyDriver {
        OnDutyDriver {
            id: id.into(),
            current_station: code(at),
            available_from: Some(t("06:00")),
            shift_start: Some(t("06:00")),
            shift_end: Some(t("14:00")),
            home_depot: code("PC"),
            bound_unit: unit.map(String::from),
        }
    }

    fn demand(earliest: FgcTime) -> Demand<'static> {
        Demand {
            unit: "U1",
            origin: code("PC"),
            destination: code("SR"),
            earliest,
            running_mins: 20,
        }
    }

    #[test]
    fn tiers_prefer_bound_then_origin_then_walk() {
        let g = graph();
        let adjacency = g.adjacency_under(&CutSet::new());
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();

        let snapshot = [
            driver("D1", "SR", None),
            driver("D2", "PC", None),
            driver("D3", "PC", Some("U1")),
        ];
        let refs: Vec<&OnDutyDriver> = snapshot.iter().collect();
        let pool = DriverPool::new(&refs, t("07:00"), &adjacency, &travel, &config);

        let choice = pool.select(&demand(t("07:00"))).unwrap();
        assert_eq!(pool.id(&choice), "D3");
        assert_eq!(choice.handover, Handover::CabinChange);
        assert_eq!(choice.start, t("07:02"));

        let refs: Vec<&OnDutyDriver> = snapshot[..2].iter().collect();
        let pool = DriverPool::new(&refs, t("07:00"), &adjacency, &travel, &config);
        let choice = pool.select(&demand(t("07:00"))).unwrap();
        assert_eq!(pool.id(&choice), "D2");
        assert_eq!(choice.start, t("07:05"));

        let refs: Vec<&OnDutyDriver> = snapshot[..1].iter().collect();
        let pool = DriverPool::new(&refs, t("07:00"), &adjacency, &travel, &config);
        let choice = pool.select(&demand(t("07:00"))).unwrap();
        assert_eq!(choice.handover, Handover::Walk { hops: 2 });
        assert_eq!(choice.start, t("07:06"));
    }

    #[test]
    fn no_walking_after_first_trip() {
        let g = graph();
        let adjacency = g.adjacency_under(&CutSet::new());
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();

        let snapshot = [driver("D1", "TT", None)];
        let refs: Vec<&OnDutyDriver> = snapshot.iter().collect();
        let mut pool = DriverPool::new(&refs, t("07:00"), &adjacency, &travel, &config);

        let first = Demand {
            unit: "U2",
            origin: code("TT"),
            destination: code("SR"),
            earliest: t("07:00"),
            running_mins: 5,
        };
        let choice = pool.select(&first).unwrap();
        pool.commit(&choice, &first);

        // Now at SR with a trip behind them: cannot walk to PC.
        assert!(pool.select(&demand(t("08:00"))).is_none());
    }

    #[test]
    fn breaks_and_extension_limit() {
        let g = graph();
        let adjacency = g.adjacency_under(&CutSet::new());
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();

        let snapshot = [driver("D1", "PC", Some("U1"))];
        let refs: Vec<&OnDutyDriver> = snapshot.iter().collect();
        let mut pool = DriverPool::new(&refs, t("06:00"), &adjacency, &travel, &config);

        // 06:00-14:00: main-break window is 08:48-11:12.
        let choice = pool.select(&demand(t("09:00"))).unwrap();
        assert_eq!(choice.start, t("09:20"));
        pool.commit(&choice, &demand(t("09:00")));

        // A long run after the break goes over the drive cap.
        let long = Demand {
            unit: "U1",
            origin: code("SR"),
            destination: code("PC"),
            earliest: t("09:45"),
            running_mins: 170,
        };
        let choice = pool.select(&long).unwrap();
        assert_eq!(choice.start, t("10:00"));

        // Past 14:45 (start + 525) is never allowed.
        let late = Demand {
            earliest: t("14:30"),
            ..long
        };
        assert!(pool.select(&late).is_none());
    }

    #[test]
    fn retirement_needs_home_depot() {
        let g = graph();
        let adjacency = g.adjacency_under(&CutSet::new());
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();

        let snapshot = [driver("D1", "SR", Some("U1"))];
        let refs: Vec<&OnDutyDriver> = snapshot.iter().collect();
        let mut pool = DriverPool::new(&refs, t("07:00"), &adjacency, &travel, &config);

        assert!(pool.retire("U1", code("TT"), t("10:00"), 3).is_none());
        assert_eq!(
            pool.retire("U1", code("PC"), t("10:00"), 6),
            Some(("D1".to_string(), t("10:00")))
        );
        assert!(pool.retire("U1", code("PC"), t("10:10"), 6).is_none());
    }
}
