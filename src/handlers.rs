use crate::error::ApiError;
use crate::models::*;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::atomic::Ordering;

// GET /v1/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let bridge = &state.bridge;
    let stats = bridge.correlator().stats();

    Json(StatusResponse {
        network: bridge.network().to_string(),
        mode: bridge.mode().as_str().to_string(),
        state: bridge.state(),
        pending_calls: bridge.correlator().pending_count(),
        calls_completed: stats.completed.load(Ordering::Relaxed),
        calls_timed_out: stats.timed_out.load(Ordering::Relaxed),
        late_callbacks: stats.late.load(Ordering::Relaxed),
        last_error: bridge.last_error(),
    })
}

// POST /v1/bridge/initialize
pub async fn initialize_bridge(State(state): State<AppState>) -> Json<InitializeResponse> {
    let state = state.bridge.initialize().await;
    Json(InitializeResponse { state })
}

// POST /v1/contracts/:contract_id/execute
pub async fn execute_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
    Json(body): Json<ExecuteContractRequest>,
) -> Result<Json<ContractCallResult>, ApiError> {
    let args = body
        .args
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            ContractArg::try_from(value)
                .map_err(|e| ApiError::InvalidArgument(format!("argument {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "Executing {} on contract {} with {} args",
        body.method,
        contract_id,
        args.len()
    );

    let result = state
        .bridge
        .execute_contract(&contract_id, &body.method, args)
        .await?;

    Ok(Json(result))
}

// GET /v1/contracts/:contract_id/state
pub async fn get_contract_state(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractCallResult>, ApiError> {
    let result = state.bridge.get_contract_state(&contract_id).await?;
    Ok(Json(result))
}

// POST /v1/bridge/callbacks/:channel
pub async fn bridge_callback(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(callback): Json<BridgeCallback>,
) -> Result<Json<CallbackAck>, ApiError> {
    let channel: Channel = channel.parse().map_err(ApiError::UnknownChannel)?;
    let accepted = state.bridge.deliver(channel, callback);
    Ok(Json(CallbackAck { accepted }))
}
