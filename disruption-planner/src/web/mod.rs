//! Web layer for the disruption planner.
//!
//! Provides JSON endpoints for relief matching, network partitioning,
//! unit allocation and trip generation. Each request carries its own
//! snapshot; the server only holds the network model.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
