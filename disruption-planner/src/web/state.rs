//! Application state for the web layer.

use std::sync::Arc;

use crate::network::NetworkModel;
use crate::planner::{Planner, PlannerConfig};
use crate::travel::GraphTravel;

/// Shared application state.
///
/// The network and configuration are loaded once and never mutated; every
/// request plans against the same snapshot.
#[derive(Clone)]
pub struct AppState {
    /// Station graph, line catalog and travel table
    pub network: Arc<NetworkModel>,

    /// Planner configuration
    pub config: Arc<PlannerConfig>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(network: NetworkModel, config: PlannerConfig) -> Self {
        Self {
            network: Arc::new(network),
            config: Arc::new(config),
        }
    }

    /// Run `f` with a planner borrowing this state.
    pub fn with_planner<R>(&self, f: impl FnOnce(&Planner<'_, GraphTravel<'_>>) -> R) -> R {
        let travel = self.network.travel();
        let planner = Planner::new(
            &self.network.graph,
            &self.network.lines,
            &travel,
            &self.config,
        );
        f(&planner)
    }
}
