pub mod config;
pub mod correlator;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod service;
pub mod transport;

#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use service::ContractService;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<ContractService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/status", get(handlers::get_status))
        .route("/v1/bridge/initialize", post(handlers::initialize_bridge))
        .route(
            "/v1/bridge/callbacks/:channel",
            post(handlers::bridge_callback),
        )
        .route(
            "/v1/contracts/:contract_id/execute",
            post(handlers::execute_contract),
        )
        .route(
            "/v1/contracts/:contract_id/state",
            get(handlers::get_contract_state),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
