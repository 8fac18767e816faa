//! The static network model: station graph, line catalog and travel table.
//!
//! A model is loaded once at start-up, from a JSON file or from the bundled
//! Barcelona–Vallès network, and shared read-only by every request.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{DomainError, LineCatalog, LineCode, StationCode, StationGraph};
use crate::travel::{GraphTravel, TravelTimes};

const BARCELONA_VALLES: &str = include_str!("../../data/barcelona-valles.json");

/// Errors loading a network model.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to read network file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid network JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid network: {0}")]
    Domain(#[from] DomainError),

    #[error("line {line} calls at unknown station {station}")]
    UnknownLineStation { line: LineCode, station: StationCode },
}

/// Everything the planner knows about the physical and commercial network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub graph: StationGraph,
    pub lines: LineCatalog,
    #[serde(default)]
    pub travel: TravelTimes,
}

impl NetworkModel {
    /// Parse and validate a model from JSON text.
    pub fn from_json(json: &str) -> Result<Self, NetworkError> {
        let model: NetworkModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            stations = model.graph.stations().count(),
            lines = model.lines.len(),
            "loaded network"
        );
        Ok(model)
    }

    /// The bundled FGC Barcelona–Vallès network.
    pub fn barcelona_valles() -> Result<Self, NetworkError> {
        Self::from_json(BARCELONA_VALLES)
    }

    /// Check that every line only calls at stations of the graph.
    pub fn validate(&self) -> Result<(), NetworkError> {
        for line in self.lines.iter() {
            if let Some(station) = line.stations.iter().find(|s| !self.graph.contains(s)) {
                return Err(NetworkError::UnknownLineStation {
                    line: line.code.clone(),
                    station: *station,
                });
            }
        }
        Ok(())
    }

    /// Travel times backed by the table, falling back to graph distance.
    pub fn travel(&self) -> GraphTravel<'_> {
        self.travel.with_graph(&self.graph)
    }
}
