use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to callers of the gateway.
///
/// Remote-call failures never end up here: they are folded into a
/// fallback `ContractCallResult`. Only caller misuse is reported as an
/// error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid contract id: {0}")]
    InvalidContractId(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown callback channel: {0}")]
    UnknownChannel(String),
}

/// Failures talking to the bridge endpoint.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("{0}")]
    Endpoint(String),

    #[error("Malformed endpoint reply: {0}")]
    MalformedReply(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidContractId(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_CONTRACT_ID", msg.clone())
            }
            ApiError::InvalidMethod(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_METHOD", msg.clone())
            }
            ApiError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
            }
            ApiError::UnknownChannel(msg) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_CHANNEL", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BridgeError::MalformedReply(err.to_string())
        } else {
            BridgeError::Unreachable(err.to_string())
        }
    }
}
