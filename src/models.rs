use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const FALLBACK_RESPONSE: &str = "fallback_response";
pub const SIMULATED_RESPONSE: &str = "simulated_response";
pub const SIMULATED_STATE: &str = "simulated_state";
pub const BRIDGE_UNAVAILABLE: &str = "Soroban SDK not available";

// ============ Bridge Core Types ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::Initializing => "initializing",
            BridgeState::Ready => "ready",
            BridgeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Named path on which the endpoint reports the outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    ContractResponse,
    ContractState,
    Error,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::ContractResponse => "contract_response",
            Channel::ContractState => "contract_state",
            Channel::Error => "error",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contract_response" => Ok(Channel::ContractResponse),
            "contract_state" => Ok(Channel::ContractState),
            "error" => Ok(Channel::Error),
            other => Err(other.to_string()),
        }
    }
}

/// Correlation identifier carried through the wire payload and echoed back
/// by the endpoint on every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single contract argument.
///
/// Encoded as the plain JSON value, so `["G_PUBKEY", 37.7749, true]` maps to
/// `[Text, Float, Bool]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContractArg {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ContractArg>),
}

impl ContractArg {
    /// NaN and infinities have no JSON form.
    pub fn is_encodable(&self) -> bool {
        match self {
            ContractArg::Float(value) => value.is_finite(),
            ContractArg::List(items) => items.iter().all(ContractArg::is_encodable),
            _ => true,
        }
    }
}

impl TryFrom<serde_json::Value> for ContractArg {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(ContractArg::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ContractArg::Int(i)),
                None => n
                    .as_f64()
                    .map(ContractArg::Float)
                    .ok_or_else(|| format!("unrepresentable number {}", n)),
            },
            Value::String(s) => Ok(ContractArg::Text(s)),
            Value::Array(items) => items
                .into_iter()
                .map(ContractArg::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(ContractArg::List),
            Value::Null => Err("null is not a contract argument".to_string()),
            Value::Object(_) => Err("objects are not contract arguments".to_string()),
        }
    }
}

impl From<&str> for ContractArg {
    fn from(value: &str) -> Self {
        ContractArg::Text(value.to_string())
    }
}

impl From<String> for ContractArg {
    fn from(value: String) -> Self {
        ContractArg::Text(value)
    }
}

impl From<i64> for ContractArg {
    fn from(value: i64) -> Self {
        ContractArg::Int(value)
    }
}

impl From<f64> for ContractArg {
    fn from(value: f64) -> Self {
        ContractArg::Float(value)
    }
}

impl From<bool> for ContractArg {
    fn from(value: bool) -> Self {
        ContractArg::Bool(value)
    }
}

impl From<Vec<ContractArg>> for ContractArg {
    fn from(value: Vec<ContractArg>) -> Self {
        ContractArg::List(value)
    }
}

/// Outcome of a contract call. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallResult {
    pub success: bool,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContractCallResult {
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
            error: None,
        }
    }

    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: FALLBACK_RESPONSE.to_string(),
            error: Some(error.into()),
        }
    }

    /// Fallback for a call that never reached the endpoint.
    pub fn unavailable() -> Self {
        Self::fallback(BRIDGE_UNAVAILABLE)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

// ============ Bridge Wire Types ============

/// Payload handed to the endpoint for one call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub id: CallId,
    pub contract_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub args: Vec<ContractArg>,
}

/// Asynchronous notification from the endpoint.
///
/// `id` is optional so endpoints that predate correlation ids can still
/// deliver; those are routed to the oldest call waiting on the channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeCallback {
    #[serde(default)]
    pub id: Option<CallId>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BridgeCallback {
    /// Text form of the payload; string payloads are passed through unquoted.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn error_text(&self) -> String {
        match &self.message {
            Some(message) if !message.is_empty() => message.clone(),
            _ => match &self.payload {
                Some(_) => self.payload_text(),
                None => "bridge endpoint reported an error".to_string(),
            },
        }
    }
}

// ============ Endpoint JSON-RPC Types ============

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcRequest<T> {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: T,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub id: Option<u64>,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    pub callback_url: String,
    pub network: String,
}

// ============ API Request Types ============

#[derive(Debug, Deserialize)]
pub struct ExecuteContractRequest {
    pub method: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

// ============ API Response Types ============

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub network: String,
    pub mode: String,
    pub state: BridgeState,
    pub pending_calls: usize,
    pub calls_completed: u64,
    pub calls_timed_out: u64,
    pub late_callbacks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub state: BridgeState,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub accepted: bool,
}
