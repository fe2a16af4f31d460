use crate::config::{BridgeConfig, BridgeMode};
use crate::correlator::Correlator;
use crate::error::{ApiError, BridgeError};
use crate::gate::InitializationGate;
use crate::models::*;
use crate::transport::BridgeTransport;
use std::sync::Arc;
use std::time::Duration;

const SHUTDOWN_MESSAGE: &str = "bridge shutting down";

/// Public face of the bridge: contract execution and state reads.
///
/// Remote failures of any kind come back as a fallback `ContractCallResult`;
/// the only `Err` is caller misuse.
pub struct ContractService {
    gate: InitializationGate,
    correlator: Arc<Correlator>,
    transport: Arc<dyn BridgeTransport>,
    call_timeout: Duration,
    network: String,
}

impl ContractService {
    pub fn new(config: &BridgeConfig, transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            gate: InitializationGate::new(
                transport.clone(),
                config.init_timeout,
                config.poll_interval,
            ),
            correlator: Arc::new(Correlator::new()),
            transport,
            call_timeout: config.call_timeout,
            network: config.network.clone(),
        }
    }

    pub async fn initialize(&self) -> BridgeState {
        self.gate.initialize().await
    }

    pub fn state(&self) -> BridgeState {
        self.gate.state()
    }

    pub fn last_error(&self) -> Option<String> {
        self.gate.last_error()
    }

    pub fn mode(&self) -> BridgeMode {
        self.transport.mode()
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub async fn execute_contract(
        &self,
        contract_id: &str,
        method: &str,
        args: Vec<ContractArg>,
    ) -> Result<ContractCallResult, ApiError> {
        validate_contract_id(contract_id)?;
        if method.trim().is_empty() || method.chars().any(char::is_whitespace) {
            return Err(ApiError::InvalidMethod(format!("{:?}", method)));
        }
        if let Some(index) = args.iter().position(|arg| !arg.is_encodable()) {
            return Err(ApiError::InvalidArgument(format!(
                "argument {} is not a finite value",
                index
            )));
        }

        Ok(self
            .invoke(Channel::ContractResponse, contract_id, Some(method), args)
            .await)
    }

    pub async fn get_contract_state(
        &self,
        contract_id: &str,
    ) -> Result<ContractCallResult, ApiError> {
        validate_contract_id(contract_id)?;

        Ok(self
            .invoke(Channel::ContractState, contract_id, None, Vec::new())
            .await)
    }

    /// Route an endpoint callback to its pending call.
    pub fn deliver(&self, channel: Channel, callback: BridgeCallback) -> bool {
        let outcome = match channel {
            Channel::Error => Err(callback.error_text()),
            Channel::ContractResponse | Channel::ContractState => Ok(callback.payload_text()),
        };

        match callback.id {
            Some(id) => self.correlator.complete(id, channel, outcome),
            None => self.correlator.complete_oldest(channel, outcome),
        }
    }

    /// Settle every in-flight call with a fallback result.
    pub fn shutdown(&self) -> usize {
        let drained = self.correlator.drain(SHUTDOWN_MESSAGE);
        if drained > 0 {
            tracing::info!("Released {} in-flight contract calls", drained);
        }
        drained
    }

    async fn invoke(
        &self,
        channel: Channel,
        contract_id: &str,
        method: Option<&str>,
        args: Vec<ContractArg>,
    ) -> ContractCallResult {
        let label = method.unwrap_or("get_contract_state");

        if !self.gate.wait_until_ready(self.gate.wait_ceiling()).await {
            tracing::warn!(
                contract_id,
                method = label,
                "Bridge unavailable, returning fallback"
            );
            return ContractCallResult::unavailable();
        }

        let handle = self.correlator.register(channel, label);
        let id = handle.id;
        let _release = PendingCallGuard {
            correlator: &self.correlator,
            id,
        };
        let request = BridgeRequest {
            id,
            contract_id: contract_id.to_string(),
            method: method.map(str::to_string),
            args,
        };

        tracing::debug!(
            call_id = %id,
            contract_id,
            method = label,
            "Dispatching contract call"
        );

        // The deadline covers the hand-off as well as the wait for a callback.
        let exchange = async {
            self.transport
                .dispatch(&request, channel, self.correlator.clone())
                .await?;
            Ok::<_, BridgeError>(handle.receiver.await)
        };

        match tokio::time::timeout(self.call_timeout, exchange).await {
            Ok(Ok(Ok(Ok(payload)))) => ContractCallResult::success(payload),
            Ok(Ok(Ok(Err(message)))) => {
                tracing::warn!(
                    call_id = %id,
                    method = label,
                    "Contract call failed: {}",
                    message
                );
                ContractCallResult::fallback(message)
            }
            Ok(Ok(Err(_))) => ContractCallResult::fallback("bridge dropped the call"),
            Ok(Err(e)) => {
                tracing::warn!(call_id = %id, "Dispatch failed: {}", e);
                ContractCallResult::fallback(e.to_string())
            }
            Err(_) => {
                self.correlator.cancel(id);
                ContractCallResult::fallback(format!(
                    "bridge call timed out after {}ms",
                    self.call_timeout.as_millis()
                ))
            }
        }
    }
}

/// Removes the call from the correlator when `invoke` ends, including when the
/// caller's future is dropped mid-call.
struct PendingCallGuard<'a> {
    correlator: &'a Correlator,
    id: CallId,
}

impl Drop for PendingCallGuard<'_> {
    fn drop(&mut self) {
        if self.correlator.discard(self.id) {
            tracing::debug!(call_id = %self.id, "Released unsettled pending call");
        }
    }
}

fn validate_contract_id(contract_id: &str) -> Result<(), ApiError> {
    if contract_id.trim().is_empty() {
        return Err(ApiError::InvalidContractId("contract id is required".to_string()));
    }
    if contract_id.chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidContractId(format!("{:?}", contract_id)));
    }
    Ok(())
}
