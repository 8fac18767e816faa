use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use disruption_planner::network::{NetworkError, NetworkModel};
use disruption_planner::planner::PlannerConfig;
use disruption_planner::web::{AppState, create_router};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

fn load_network() -> Result<NetworkModel, NetworkError> {
    match std::env::var("DISRUPTION_NETWORK") {
        Ok(path) => NetworkModel::load_from_file(path),
        Err(_) => {
            info!("DISRUPTION_NETWORK not set, using the built-in Barcelona-Vallès network");
            NetworkModel::barcelona_valles()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let network = match load_network() {
        Ok(network) => network,
        Err(e) => {
            error!(error = %e, "failed to load network");
            std::process::exit(1);
        }
    };

    let raw_addr = std::env::var("DISRUPTION_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = match raw_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(addr = %raw_addr, error = %e, "invalid DISRUPTION_ADDR");
            std::process::exit(1);
        }
    };

    let state = AppState::new(network, PlannerConfig::default());
    let app = create_router(state);

    info!(%addr, "disruption planner listening");
    info!("  GET  /health             - Health check");
    info!("  GET  /network            - Stations, segments, branches and lines");
    info!("  POST /relief             - Relief candidates for an uncovered shift");
    info!("  POST /islands            - Partition the network under an incident");
    info!("  POST /allocation         - Unit counts per line for an island");
    info!("  POST /allocation/adjust  - Nudge one line's count");
    info!("  POST /trips              - Shuttle timetable for an island");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
