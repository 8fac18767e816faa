//! Entry point tying the planning stages together.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::allocation::{ResourceCounts, assign_units};
use super::config::PlannerConfig;
use super::partition::{Island, IslandMap, partition};
use super::relief::{CoveragePlan, match_relief};
use super::request::{PartitionRequest, PlanningRequest, ReliefRequest};
use super::trips::{GenerationInput, TripGenerator, TripPlan};
use crate::domain::{LineCatalog, OnDutyDriver, StationGraph, Unit};
use crate::travel::TravelLookup;

/// An island with the units allocated to each of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub island: Island,
    pub counts: ResourceCounts,
}

/// A full replacement service for one island.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub island: Island,
    pub counts: ResourceCounts,
    pub plan: TripPlan,
}

/// Disruption planner over one network.
///
/// Every method is a pure function of its request: nothing is cached
/// between calls.
pub struct Planner<'a, T: TravelLookup> {
    graph: &'a StationGraph,
    catalog: &'a LineCatalog,
    travel: &'a T,
    config: &'a PlannerConfig,
}

impl<'a, T: TravelLookup> Planner<'a, T> {
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

    /// Relief candidates for every circulation of an uncovered shift.
    pub fn relief(&self, request: &ReliefRequest) -> CoveragePlan {
        match_relief(request, self.travel, self.config)
    }

    /// Islands of the network under an incident.
    pub fn partition(&self, request: &PartitionRequest) -> IslandMap {
        partition(self.graph, request)
    }

    /// Per-line unit counts for the requested island, with manual counts
    /// applied. `None` if the island does not exist under these cuts.
    pub fn allocate(&self, request: &PlanningRequest) -> Option<Allocation> {
        let (island, units, drivers) = self.island_resources(request)?;
        let counts = self.counts_for(&island, &units, drivers.len(), request);
        Some(Allocation { island, counts })
    }

    /// Allocation plus the generated timetable for the requested island.
    pub fn plan(&self, request: &PlanningRequest) -> Option<ServicePlan> {
        let (island, units, drivers) = self.island_resources(request)?;
        let counts = self.counts_for(&island, &units, drivers.len(), request);
        let assigned = assign_units(&counts, self.catalog, self.graph, &island.stations, &units);

        let generator = TripGenerator::new(self.graph, self.catalog, self.travel, self.config);
        let plan = generator.generate(&GenerationInput {
            island: &island,
            cuts: &request.cuts,
            counts: &counts,
            units: &assigned,
            drivers: &drivers,
            now: request.now,
            history: &request.history,
            headways: &request.headways,
        });

        Some(ServicePlan {
            island,
            counts,
            plan,
        })
    }

    /// The island named in the request, with the unaffected units and the
    /// drivers inside it.
    fn island_resources<'r>(
        &self,
        request: &'r PlanningRequest,
    ) -> Option<(Island, Vec<&'r Unit>, Vec<&'r OnDutyDriver>)> {
        let map = partition(
            self.graph,
            &PartitionRequest {
                cuts: request.cuts.clone(),
                units: request.units.clone(),
                range_selection: false,
            },
        );
        let Some(island) = map.find(&request.island).cloned() else {
            info!(island = %request.island, "island not found under current cuts");
            return None;
        };

        let units: Vec<&Unit> = request
            .units
            .iter()
            .filter(|u| island.units.contains(&u.id))
            .collect();
        let drivers: Vec<&OnDutyDriver> = request
            .drivers
            .iter()
            .filter(|d| island.contains(&d.current_station))
            .filter(|d| {
                let usable = d.duty_times().is_some();
                if !usable {
                    debug!(driver = %d.id, "driver without usable duty times left out");
                }
                usable
            })
            .collect();
        debug!(
            island = %island.name,
            stations = island.stations.len(),
            units = units.len(),
            drivers = drivers.len(),
            "island resources"
        );
        Some((island, units, drivers))
    }

    fn counts_for(
        &self,
        island: &Island,
        units: &[&Unit],
        drivers: usize,
        request: &PlanningRequest,
    ) -> ResourceCounts {
        let counts =
            ResourceCounts::default_allocation(self.catalog, &island.stations, units, drivers);
        match &request.counts {
            Some(manual) => counts.with_overrides(manual),
            None => counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::domain::{
        Branch, CutSet, EdgeKey, FgcTime, LineCode, LineRole, LineSpec, StationCode, StationNode,
        TrainPosition,
    };
    use crate::travel::TravelTimes;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    fn t(s: &str) -> FgcTime {
        FgcTime::parse_hhmm(s).unwrap()
    }

    fn graph() -> StationGraph {
        let nodes = ["PC", "GR", "SR", "RE"]
            .iter()
            .map(|c| StationNode {
                code: code(c),
                name: String::new(),
                is_depot: *c == "RE",
            })
            .collect();
        let edges = [("PC", "GR"), ("GR", "SR"), ("SR", "RE")]
            .iter()
            .map(|(a, b)| EdgeKey::new(code(a), code(b)))
            .collect();
        let branches = vec![
            Branch {
                name: "Barcelona".into(),
                terminal: code("PC"),
            },
            Branch {
                name: "Reina Elisenda".into(),
                terminal: code("RE"),
            },
        ];
        StationGraph::new(nodes, edges, branches).unwrap()
    }

    fn catalog() -> LineCatalog {
        LineCatalog::new(vec![
            LineSpec {
                code: LineCode::new("L6"),
                role: LineRole::TrunkConnector,
                stations: vec![code("PC"), code("GR"), code("SR")],
            },
            LineSpec {
                code: LineCode::new("L12"),
                role: LineRole::Branch,
                stations: vec![code("SR"), code("RE")],
            },
        ])
    }

    fn request(island: &str) -> PlanningRequest {
        PlanningRequest {
            cuts: CutSet::new().cut_segment(code("GR"), code("SR")),
            island: island.into(),
            units: vec![
                Unit {
                    id: "U1".into(),
                    line: Some(LineCode::new("L12")),
                    position: TrainPosition::AtStation { station: code("RE") },
                },
                Unit {
                    id: "U2".into(),
                    line: None,
                    position: TrainPosition::AtStation { station: code("PC") },
                },
            ],
            drivers: vec![OnDutyDriver {
                id: "D1".into(),
                current_station: code("SR"),
                available_from: Some(t("06:00")),
                shift_start: Some(t("06:00")),
                shift_end: Some(t("14:00")),
                home_depot: code("RE"),
                bound_unit: None,
            }],
            now: t("08:00"),
            history: Vec::new(),
            counts: None,
            headways: BTreeMap::new(),
        }
    }

    #[test]
    fn plans_only_inside_the_requested_island() {
        let g = graph();
        let lines = catalog();
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig {
            default_service_end: t("09:00"),
            ..PlannerConfig::default()
        };
        let planner = Planner::new(&g, &lines, &travel, &config);

        let allocation = planner.allocate(&request("Reina Elisenda")).unwrap();
        assert_eq!(allocation.island.units, vec!["U1"]);
        assert_eq!(allocation.counts.count(&LineCode::new("L12")), 1);
        assert_eq!(allocation.counts.count(&LineCode::new("L6")), 0);

        let service = planner.plan(&request("Reina Elisenda")).unwrap();
        assert!(service.plan.trips.iter().all(|t| t.line == LineCode::new("L12")));
        assert!(service.plan.shift_sheets.contains_key("D1"));

        // No driver in the Barcelona island: nothing can be allocated.
        let allocation = planner.allocate(&request("Barcelona")).unwrap();
        assert_eq!(allocation.counts.total(), 0);

        assert!(planner.plan(&request("Nowhere")).is_none());
    }

    #[test]
    fn manual_counts_are_applied() {
        let g = graph();
        let lines = catalog();
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();
        let planner = Planner::new(&g, &lines, &travel, &config);

        let mut req = request("Reina Elisenda");
        req.counts = Some(BTreeMap::from([(LineCode::new("L12"), 0)]));
        let allocation = planner.allocate(&req).unwrap();
        assert_eq!(allocation.counts.total(), 0);
    }

    #[test]
    fn drivers_with_unparsed_times_are_left_out() {
        let g = graph();
        let lines = catalog();
        let table = TravelTimes::new();
        let travel = table.with_graph(&g);
        let config = PlannerConfig::default();
        let planner = Planner::new(&g, &lines, &travel, &config);

        let mut req = request("Reina Elisenda");
        req.drivers[0].available_from = None;
        let allocation = planner.allocate(&req).unwrap();
        assert_eq!(allocation.counts.cap(), 0);

        let service = planner.plan(&req).unwrap();
        assert!(service.plan.shift_sheets.is_empty());
    }
}
