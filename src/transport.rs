use crate::config::{BridgeConfig, BridgeMode};
use crate::correlator::Correlator;
use crate::error::BridgeError;
use crate::models::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How the bridge reaches the contract runtime.
///
/// `dispatch` only hands the request over. The outcome arrives later through
/// the correlator, either from the callback routes or from the transport
/// itself.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    fn mode(&self) -> BridgeMode;

    /// Detect and handshake with the endpoint.
    async fn setup(&self) -> Result<(), BridgeError>;

    async fn dispatch(
        &self,
        request: &BridgeRequest,
        channel: Channel,
        sink: Arc<Correlator>,
    ) -> Result<(), BridgeError>;
}

pub fn transport_for(config: &BridgeConfig) -> Result<Arc<dyn BridgeTransport>, BridgeError> {
    let transport: Arc<dyn BridgeTransport> = match config.mode {
        BridgeMode::Simulated => Arc::new(SimulatedTransport::new(config.simulated_delay)),
        BridgeMode::Live => Arc::new(LiveEndpointTransport::new(
            &config.endpoint_url,
            &config.callback_url,
            &config.network,
            config.call_timeout,
        )?),
    };
    Ok(transport)
}

// ============ Simulated ============

/// Answers every call with a marker value after a fixed delay.
pub struct SimulatedTransport {
    delay: Duration,
}

impl SimulatedTransport {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl BridgeTransport for SimulatedTransport {
    fn mode(&self) -> BridgeMode {
        BridgeMode::Simulated
    }

    async fn setup(&self) -> Result<(), BridgeError> {
        tracing::info!("No live bridge endpoint, contract calls will be simulated");
        Ok(())
    }

    async fn dispatch(
        &self,
        request: &BridgeRequest,
        channel: Channel,
        sink: Arc<Correlator>,
    ) -> Result<(), BridgeError> {
        let id = request.id;
        let delay = self.delay;
        let payload = match channel {
            Channel::ContractState => SIMULATED_STATE,
            _ => SIMULATED_RESPONSE,
        };

        tracing::debug!(
            call_id = %id,
            contract_id = %request.contract_id,
            method = request.method.as_deref().unwrap_or("-"),
            "Simulating contract call"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.complete(id, channel, Ok(payload.to_string()));
        });

        Ok(())
    }
}

// ============ Live endpoint ============

/// JSON-RPC client for an out-of-process bridge endpoint.
///
/// The endpoint acknowledges each request synchronously and reports the
/// outcome later by posting to the gateway's callback routes, echoing the
/// call id. Each HTTP request is bounded by `request_timeout`; an endpoint
/// that accepts the connection and never answers is reported as unreachable.
pub struct LiveEndpointTransport {
    client: Client,
    url: String,
    callback_url: String,
    network: String,
    request_id: AtomicU64,
}

impl LiveEndpointTransport {
    pub fn new(
        url: &str,
        callback_url: &str,
        network: &str,
        request_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            callback_url: callback_url.to_string(),
            network: network.to_string(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request whose only reply is an acknowledgement. A `null` result
    /// counts as success.
    async fn call<T>(&self, method: &str, params: T) -> Result<(), BridgeError>
    where
        T: serde::Serialize,
    {
        let id = self.next_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(BridgeError::Unreachable(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let rpc_response: JsonRpcResponse<Value> = response.json().await?;

        if let Some(error) = rpc_response.error {
            tracing::debug!(method, code = error.code, "Bridge endpoint rejected request");
            return Err(BridgeError::Endpoint(error.message));
        }

        tracing::trace!(method, result = ?rpc_response.result, "Bridge endpoint acknowledged");

        match rpc_response.id {
            Some(reply_id) if reply_id != id => Err(BridgeError::MalformedReply(format!(
                "reply id {} does not match request id {}",
                reply_id, id
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BridgeTransport for LiveEndpointTransport {
    fn mode(&self) -> BridgeMode {
        BridgeMode::Live
    }

    async fn setup(&self) -> Result<(), BridgeError> {
        tracing::info!("Connecting to bridge endpoint at {}", self.url);

        self.call(
            "initialize",
            SetupParams {
                callback_url: self.callback_url.clone(),
                network: self.network.clone(),
            },
        )
        .await
    }

    async fn dispatch(
        &self,
        request: &BridgeRequest,
        channel: Channel,
        _sink: Arc<Correlator>,
    ) -> Result<(), BridgeError> {
        let method = match channel {
            Channel::ContractState => "getContractState",
            _ => "executeContract",
        };

        tracing::debug!(call_id = %request.id, method, "Dispatching to bridge endpoint");

        self.call(method, request).await
    }
}
