//! Slot construction and crew assignment.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::drivers::{Demand, DriverPool};
use super::headway::{
    computed_headway, observed_running_minutes, observed_service_end, route_has_single_track,
};
use super::{Direction, DriverAssignment, Trip, TripPlan, UnitAssignment};
use crate::domain::{
    Adjacency, Circulation, CutSet, FgcTime, LineCatalog, LineCode, MINUTES_PER_DAY, OnDutyDriver,
    StationCode, StationGraph, Unit, shortest_path,
};
use crate::planner::allocation::ResourceCounts;
use crate::planner::config::PlannerConfig;
use crate::planner::partition::Island;
use crate::travel::TravelLookup;

/// Longest manual headway honoured; anything above runs one trip a day.
const MAX_HEADWAY_MINS: i32 = MINUTES_PER_DAY;

/// Everything one generation run reads.
pub struct GenerationInput<'a> {
    pub island: &'a Island,
    pub cuts: &'a CutSet,
    pub counts: &'a ResourceCounts,
    /// Units serving each line, as chosen by the allocation.
    pub units: &'a BTreeMap<LineCode, Vec<&'a Unit>>,
    /// Drivers available inside the island.
    pub drivers: &'a [&'a OnDutyDriver],
    pub now: FgcTime,
    pub history: &'a [Circulation],
    /// Manual headways overriding the computed ones.
    pub headways: &'a BTreeMap<LineCode, i32>,
}

/// Per-line shuttle between the innermost and outermost island stations.
#[derive(Debug, Clone)]
struct LineRoute {
    inner: StationCode,
    outer: StationCode,
    /// Inner to outer.
    path: Vec<StationCode>,
    running_mins: i32,
    headway: i32,
    service_end: FgcTime,
}

#[derive(Debug, Clone)]
struct Slot {
    time: FgcTime,
    line: LineCode,
    direction: Direction,
}

#[derive(Debug, Clone)]
struct UnitState {
    id: String,
    line: LineCode,
    location: StationCode,
    available: FgcTime,
}

/// Builds the replacement timetable for one island.
pub struct TripGenerator<'a, T> {
    graph: &'a StationGraph,
    catalog: &'a LineCatalog,
    travel: &'a T,
    config: &'a PlannerConfig,
}

impl<'a, T: TravelLookup> TripGenerator<'a, T> {
    pub fn new(
        graph: &'a StationGraph,
        catalog: &'a LineCatalog,
        travel: &'a T,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            graph,
            catalog,
            travel,
            config,
        }
    }

    pub fn generate(&self, input: &GenerationInput) -> TripPlan {
        let adjacency = self.graph.adjacency_under(input.cuts);
        let routes = self.routes(input, &adjacency);
        let slots = self.slots(input, &routes);

        let mut units = self.position_units(input, &routes, &adjacency);
        let mut pool = DriverPool::new(
            input.drivers,
            input.now,
            &adjacency,
            self.travel,
            self.config,
        );
        for unit in &units {
            pool.follow_unit(&unit.id, unit.location, unit.available);
        }

        let mut trips: Vec<Trip> = Vec::new();
        let mut sequence: BTreeMap<LineCode, u32> = BTreeMap::new();
        let mut last_start: BTreeMap<(LineCode, Direction), FgcTime> = BTreeMap::new();
        let mut next_id = |line: &LineCode| {
            let n = sequence.entry(line.clone()).or_default();
            *n += 1;
            format!("{line}-{n:03}")
        };

        for slot in &slots {
            let Some(route) = routes.get(&slot.line) else {
                continue;
            };
            let (origin, destination, path) = match slot.direction {
                Direction::Ascending => (route.inner, route.outer, route.path.clone()),
                _ => (
                    route.outer,
                    route.inner,
                    route.path.iter().rev().copied().collect(),
                ),
            };

            let key = (slot.line.clone(), slot.direction);
            let mut earliest = slot.time;
            if let Some(previous) = last_start.get(&key) {
                earliest = earliest.max(*previous + route.headway);
            }

            let unit = units
                .iter_mut()
                .filter(|u| u.line == slot.line && u.location == origin)
                .min_by(|a, b| (a.available, &a.id).cmp(&(b.available, &b.id)));

            let Some(unit) = unit else {
                trips.push(Trip {
                    id: next_id(&slot.line),
                    line: slot.line.clone(),
                    direction: slot.direction,
                    origin,
                    destination,
                    departure: earliest,
                    arrival: earliest + route.running_mins,
                    route: path,
                    unit: UnitAssignment::Unassigned,
                    driver: DriverAssignment::Unassigned,
                });
                last_start.insert(key, earliest);
                continue;
            };

            earliest = earliest.max(unit.available);
            let demand = Demand {
                unit: &unit.id,
                origin,
                destination,
                earliest,
                running_mins: route.running_mins,
            };

            let selection = pool.select(&demand);
            let (start, driver) = match &selection {
                Some(choice) => {
                    let id = pool.id(choice).to_string();
                    pool.commit(choice, &demand);
                    (choice.start, DriverAssignment::Driver(id))
                }
                None => {
                    debug!(line = %slot.line, %earliest, unit = %unit.id, "no driver for slot");
                    (earliest, DriverAssignment::Unassigned)
                }
            };
            let end = start + route.running_mins;

            trips.push(Trip {
                id: next_id(&slot.line),
                line: slot.line.clone(),
                direction: slot.direction,
                origin,
                destination,
                departure: start,
                arrival: end,
                route: path,
                unit: UnitAssignment::Unit(unit.id.clone()),
                driver: driver.clone(),
            });
            last_start.insert(key, start);
            unit.location = destination;
            unit.available = end;

            if self.config.has_maneuver(&slot.line, &destination) {
                let m = self.config.maneuver_mins;
                for half in 0..2 {
                    let departure = end + m * half;
                    trips.push(Trip {
                        id: next_id(&slot.line),
                        line: slot.line.clone(),
                        direction: Direction::Maneuver,
                        origin: destination,
                        destination,
                        departure,
                        arrival: departure + m,
                        route: vec![destination],
                        unit: UnitAssignment::Unit(unit.id.clone()),
                        driver: driver.clone(),
                    });
                }
                unit.available = end + 2 * m;
                if let Some(choice) = &selection {
                    pool.extend(choice, 2 * m);
                }
            }
        }

        trips.extend(self.retirements(input, &adjacency, &mut units, &mut pool));

        let headways = routes
            .iter()
            .map(|(line, route)| (line.clone(), route.headway))
            .collect();
        let plan = TripPlan::new(trips, headways);
        info!(
            island = %input.island.name,
            trips = plan.trips.len(),
            unassigned = plan.unassigned,
            driverless = plan.driverless,
            "generated shuttle plan"
        );
        plan
    }

    /// Endpoints, running time, headway and service end of every enabled
    /// line that can run inside the island.
    fn routes(&self, input: &GenerationInput, adjacency: &Adjacency) -> BTreeMap<LineCode, LineRoute> {
        let stations = &input.island.stations;
        let mut routes = BTreeMap::new();

        for (code, count) in input.counts.enabled() {
            let Some(line) = self.catalog.get(code) else {
                continue;
            };
            let Some((inner, outer)) = line.endpoints_within(stations) else {
                continue;
            };
            let Some(path) = shortest_path(adjacency, inner, outer) else {
                warn!(line = %code, %inner, %outer, "line endpoints not connected");
                continue;
            };

            let running_mins = observed_running_minutes(input.history, code, inner, outer)
                .unwrap_or_else(|| self.travel.minutes(inner, outer))
                .max(1);
            let single_track = route_has_single_track(&path, input.cuts);
            let headway = match input.headways.get(code) {
                Some(&manual) if manual > MAX_HEADWAY_MINS => {
                    warn!(line = %code, manual, "manual headway clamped to one day");
                    MAX_HEADWAY_MINS
                }
                Some(&manual) if manual > 0 => manual,
                _ => computed_headway(
                    running_mins,
                    count,
                    single_track,
                    self.config.single_track_penalty_mins,
                ),
            };
            let service_end = observed_service_end(input.history, code, stations)
                .unwrap_or(self.config.default_service_end);

            debug!(line = %code, %inner, %outer, running_mins, headway, single_track, "line route");
            routes.insert(
                code.clone(),
                LineRoute {
                    inner,
                    outer,
                    path,
                    running_mins,
                    headway,
                    service_end,
                },
            );
        }
        routes
    }

    /// Alternating slots from the planning clock to each line's service end,
    /// with paired lines cut to equal length, in time order.
    fn slots(&self, input: &GenerationInput, routes: &BTreeMap<LineCode, LineRoute>) -> Vec<Slot> {
        let mut per_line: BTreeMap<LineCode, Vec<Slot>> = BTreeMap::new();
        for (line, route) in routes {
            let mut slots = Vec::new();
            let mut time = input.now;
            let mut ascending = true;
            while time <= route.service_end {
                slots.push(Slot {
                    time,
                    line: line.clone(),
                    direction: if ascending {
                        Direction::Ascending
                    } else {
                        Direction::Descending
                    },
                });
                ascending = !ascending;
                time = time + route.headway;
            }
            per_line.insert(line.clone(), slots);
        }

        let lines: Vec<LineCode> = per_line.keys().cloned().collect();
        for line in &lines {
            let Some(sibling) = input.counts.sibling(line) else {
                continue;
            };
            let (Some(a), Some(b)) = (per_line.get(line), per_line.get(sibling)) else {
                continue;
            };
            let len = a.len().min(b.len());
            for code in [line, sibling] {
                if let Some(slots) = per_line.get_mut(code) {
                    slots.truncate(len);
                }
            }
        }

        let mut slots: Vec<Slot> = per_line.into_values().flatten().collect();
        slots.sort_by(|a, b| (a.time, &a.line, a.direction).cmp(&(b.time, &b.line, b.direction)));
        slots
    }

    /// Spread each line's units over its two endpoints, closest to the inner
    /// end first. A unit is ready once its positioning run is done.
    fn position_units(
        &self,
        input: &GenerationInput,
        routes: &BTreeMap<LineCode, LineRoute>,
        adjacency: &Adjacency,
    ) -> Vec<UnitState> {
        let hops = |from: StationCode, to: StationCode| {
            shortest_path(adjacency, from, to).map_or(0, |p| p.len() as i32 - 1)
        };

        let mut states = Vec::new();
        for (line, route) in routes {
            let Some(units) = input.units.get(line) else {
                continue;
            };
            let mut units: Vec<&Unit> = units.clone();
            units.sort_by_key(|u| (hops(u.position.station(), route.inner), u.id.clone()));

            for (i, unit) in units.iter().enumerate() {
                let target = if i % 2 == 0 { route.inner } else { route.outer };
                let run = hops(unit.position.station(), target) * self.config.run_mins_per_hop;
                states.push(UnitState {
                    id: unit.id.clone(),
                    line: line.clone(),
                    location: target,
                    available: input.now + run,
                });
            }
        }
        states
    }

    /// Send every unit to the nearest depot inside the island.
    fn retirements(
        &self,
        input: &GenerationInput,
        adjacency: &Adjacency,
        units: &mut [UnitState],
        pool: &mut DriverPool<'_, T>,
    ) -> Vec<Trip> {
        let depots: Vec<StationCode> = self
            .graph
            .depots()
            .filter(|d| input.island.contains(d) && !input.cuts.is_station_blocked(d))
            .collect();

        units.sort_by(|a, b| a.id.cmp(&b.id));
        let mut trips = Vec::new();
        for unit in units.iter_mut() {
            let nearest = depots
                .iter()
                .filter_map(|d| shortest_path(adjacency, unit.location, *d))
                .min_by(|a, b| (a.len(), a.last()).cmp(&(b.len(), b.last())));
            let Some(route) = nearest else {
                debug!(unit = %unit.id, "no reachable depot in island");
                continue;
            };
            let Some(depot) = route.last().copied() else {
                continue;
            };
            if depot == unit.location {
                continue;
            }

            let running_mins = self.travel.minutes(unit.location, depot).max(1);
            let (departure, driver) = match pool.retire(&unit.id, depot, unit.available, running_mins) {
                Some((driver, start)) => (start, DriverAssignment::Driver(driver)),
                None => (unit.available, DriverAssignment::Driverless),
            };

            trips.push(Trip {
                id: format!("RET-{}", unit.id),
                line: unit.line.clone(),
                direction: Direction::Retirement,
                origin: unit.location,
                destination: depot,
                departure,
                arrival: departure + running_mins,
                route,
                unit: UnitAssignment::Unit(unit.id.clone()),
                driver,
            });
            unit.location = depot;
            unit.available = departure + running_mins;
        }
        trips
    }
}
