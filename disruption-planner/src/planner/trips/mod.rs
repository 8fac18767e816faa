//! Replacement shuttle timetable for an island.
//!
//! The generator lays alternating ascending and descending slots on every
//! enabled line, then walks them in time order handing each one a unit and
//! a driver. Slots that cannot be crewed are still emitted, carrying an
//! explicit unassigned marker.

mod drivers;
mod generator;
mod headway;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FgcTime, LineCode, StationCode};

pub use generator::{GenerationInput, TripGenerator};
pub use headway::{
    computed_headway, observed_running_minutes, observed_service_end, route_has_single_track,
};

/// What a trip does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Innermost to outermost island station of the line.
    Ascending,
    /// Outermost to innermost.
    Descending,
    /// Shunting movement at a terminus.
    Maneuver,
    /// Empty run to a depot at the end of service.
    Retirement,
}

/// Unit working a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum UnitAssignment {
    Unit(String),
    /// No unit stood at the origin.
    Unassigned,
}

/// Driver working a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DriverAssignment {
    Driver(String),
    /// No driver could legally take the trip.
    Unassigned,
    /// Retirement run with no driver whose home depot matches.
    Driverless,
}

impl DriverAssignment {
    pub fn driver_id(&self) -> Option<&str> {
        match self {
            DriverAssignment::Driver(id) => Some(id),
            _ => None,
        }
    }
}

/// One generated trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub line: LineCode,
    pub direction: Direction,
    pub origin: StationCode,
    pub destination: StationCode,
    pub departure: FgcTime,
    pub arrival: FgcTime,
    /// Stations passed, origin and destination included.
    pub route: Vec<StationCode>,
    pub unit: UnitAssignment,
    pub driver: DriverAssignment,
}

impl Trip {
    /// Ascending or descending passenger trip.
    pub fn is_service(&self) -> bool {
        matches!(self.direction, Direction::Ascending | Direction::Descending)
    }
}

/// A generated timetable with its crew groupings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPlan {
    /// Trips by departure, then id.
    pub trips: Vec<Trip>,

    /// Headway used on each line, in minutes.
    pub headways: BTreeMap<LineCode, i32>,

    /// Trip ids worked by each driver, in departure order.
    pub shift_sheets: BTreeMap<String, Vec<String>>,

    /// Trips with no driver.
    pub unassigned: usize,

    /// Retirement runs left without a driver.
    pub driverless: usize,
}

impl TripPlan {
    pub fn new(mut trips: Vec<Trip>, headways: BTreeMap<LineCode, i32>) -> Self {
        trips.sort_by(|a, b| (a.departure, &a.id).cmp(&(b.departure, &b.id)));

        let mut shift_sheets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for trip in &trips {
            if let Some(driver) = trip.driver.driver_id() {
                shift_sheets
                    .entry(driver.to_string())
                    .or_default()
                    .push(trip.id.clone());
            }
        }

        let unassigned = trips
            .iter()
            .filter(|t| t.driver == DriverAssignment::Unassigned)
            .count();
        let driverless = trips
            .iter()
            .filter(|t| t.driver == DriverAssignment::Driverless)
            .count();

        Self {
            trips,
            headways,
            shift_sheets,
            unassigned,
            driverless,
        }
    }

    /// Trips of one line in one direction, by departure.
    pub fn trips_on<'a>(
        &'a self,
        line: &'a LineCode,
        direction: Direction,
    ) -> impl Iterator<Item = &'a Trip> + 'a {
        self.trips
            .iter()
            .filter(move |t| &t.line == line && t.direction == direction)
    }

    /// Trips worked by a driver, by departure.
    pub fn trips_for<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a Trip> + 'a {
        self.trips
            .iter()
            .filter(move |t| t.driver.driver_id() == Some(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn trip(id: &str, dep: i32, driver: DriverAssignment) -> Trip {
        Trip {
            id: id.into(),
            line: LineCode::new("S1"),
            direction: Direction::Ascending,
            origin: code("PC"),
            destination: code("SR"),
            departure: FgcTime::from_minutes(dep),
            arrival: FgcTime::from_minutes(dep + 20),
            route: vec![code("PC"), code("SR")],
            unit: UnitAssignment::Unit("112.01".into()),
            driver,
        }
    }

    #[test]
    fn plan_groups_sheets_and_counts_shortfalls() {
        let plan = TripPlan::new(
            vec![
                trip("S1-002", 500, DriverAssignment::Driver("D1".into())),
                trip("S1-001", 480, DriverAssignment::Driver("D1".into())),
                trip("S1-003", 520, DriverAssignment::Unassigned),
                trip("RET-1", 600, DriverAssignment::Driverless),
            ],
            BTreeMap::new(),
        );

        assert_eq!(plan.trips[0].id, "S1-001");
        assert_eq!(plan.shift_sheets["D1"], vec!["S1-001", "S1-002"]);
        assert_eq!(plan.unassigned, 1);
        assert_eq!(plan.driverless, 1);
        assert_eq!(plan.trips_for("D1").count(), 2);
    }

    #[test]
    fn sentinel_json_shape() {
        let json = serde_json::to_string(&DriverAssignment::Unassigned).unwrap();
        assert_eq!(json, r#"{"kind":"unassigned"}"#);
        let json = serde_json::to_string(&UnitAssignment::Unit("112.01".into())).unwrap();
        assert_eq!(json, r#"{"kind":"unit","id":"112.01"}"#);
    }
}
