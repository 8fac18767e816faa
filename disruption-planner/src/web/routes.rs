//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::planner::{PartitionRequest, PlanningRequest, ReliefRequest};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/network", get(network))
        .route("/relief", post(relief))
        .route("/islands", post(islands))
        .route("/allocation", post(allocation))
        .route("/allocation/adjust", post(adjust_allocation))
        .route("/trips", post(trips))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a JSON body, mapping failures to a 400.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(body), "JSON parse error");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })
}

fn island_not_found(name: &str) -> AppError {
    AppError::NotFound {
        message: format!("Island {name} not found under the current cuts"),
    }
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stations: state.network.graph.stations().count(),
        lines: state.network.lines.len(),
    })
}

/// The loaded network: stations, segments, branches and lines.
async fn network(State(state): State<AppState>) -> Json<NetworkResponse> {
    Json(NetworkResponse::from_model(&state.network))
}

/// Relief candidates for an uncovered shift.
async fn relief(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ReliefResponse>, AppError> {
    let req: ReliefRequest = parse_body(&body)?;
    let plan = state.with_planner(|planner| planner.relief(&req));
    info!(
        shift = %plan.target_shift,
        covered = plan.covered,
        uncovered = plan.uncovered,
        "relief matched"
    );
    Ok(Json(ReliefResponse::from_plan(plan)))
}

/// Islands of the network under an incident.
async fn islands(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IslandsResponse>, AppError> {
    let req: PartitionRequest = parse_body(&body)?;
    let map = state.with_planner(|planner| planner.partition(&req));
    Ok(Json(IslandsResponse::from_map(map)))
}

/// Default (or manually overridden) unit counts for one island.
async fn allocation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AllocationResponse>, AppError> {
    let req: PlanningRequest = parse_body(&body)?;
    let allocation = state
        .with_planner(|planner| planner.allocate(&req))
        .ok_or_else(|| island_not_found(&req.island))?;
    Ok(Json(AllocationResponse::new(
        &allocation.island,
        allocation.counts,
    )))
}

/// Nudge one line's count up or down, keeping paired lines together.
async fn adjust_allocation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AllocationResponse>, AppError> {
    let req: AdjustRequest = parse_body(&body)?;
    let allocation = state
        .with_planner(|planner| planner.allocate(&req.planning))
        .ok_or_else(|| island_not_found(&req.planning.island))?;

    let mut counts = allocation.counts;
    let applied = match req.step {
        AdjustStep::Increment => counts.increment(&req.line),
        AdjustStep::Decrement => counts.decrement(&req.line),
    };
    if !applied {
        info!(line = %req.line, step = ?req.step, "adjustment not applied");
    }

    let mut response = AllocationResponse::new(&allocation.island, counts);
    response.adjusted = Some(applied);
    Ok(Json(response))
}

/// Replacement timetable for one island.
async fn trips(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TripsResponse>, AppError> {
    let req: PlanningRequest = parse_body(&body)?;
    let island = req.island.clone();
    // CPU-bound: run on the blocking pool.
    let service = tokio::task::spawn_blocking(move || {
        state.with_planner(|planner| planner.plan(&req))
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("trip generation failed: {e}"),
    })?
    .ok_or_else(|| island_not_found(&island))?;
    info!(
        island = %service.island.name,
        trips = service.plan.trips.len(),
        unassigned = service.plan.unassigned,
        driverless = service.plan.driverless,
        "trips generated"
    );
    Ok(Json(TripsResponse {
        island: service.island.name,
        counts: service.counts,
        plan: service.plan,
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
