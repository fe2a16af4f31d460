//! Scripted transport for unit tests.

use crate::config::BridgeMode;
use crate::correlator::Correlator;
use crate::error::BridgeError;
use crate::models::{BridgeRequest, Channel};
use crate::transport::BridgeTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records dispatched requests and never answers them on its own; tests
/// deliver callbacks through the correlator.
#[derive(Default)]
pub struct ScriptedTransport {
    setup_calls: AtomicUsize,
    setup_delay: Duration,
    setup_error: Mutex<Option<String>>,
    dispatch_error: Mutex<Option<String>>,
    hang_dispatch: AtomicBool,
    dispatched: Mutex<Vec<(BridgeRequest, Channel)>>,
}

impl ScriptedTransport {
    pub fn with_setup_delay(setup_delay: Duration) -> Self {
        Self {
            setup_delay,
            ..Self::default()
        }
    }

    pub fn fail_setup(&self, message: &str) {
        *self.setup_error.lock() = Some(message.to_string());
    }

    pub fn succeed_setup(&self) {
        *self.setup_error.lock() = None;
    }

    pub fn fail_dispatch(&self, message: &str) {
        *self.dispatch_error.lock() = Some(message.to_string());
    }

    /// Make `dispatch` record the request and then never return.
    pub fn hang_dispatch(&self) {
        self.hang_dispatch.store(true, Ordering::SeqCst);
    }

    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> Vec<(BridgeRequest, Channel)> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl BridgeTransport for ScriptedTransport {
    fn mode(&self) -> BridgeMode {
        BridgeMode::Live
    }

    async fn setup(&self) -> Result<(), BridgeError> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        if !self.setup_delay.is_zero() {
            tokio::time::sleep(self.setup_delay).await;
        }
        let error = self.setup_error.lock().clone();
        match error {
            Some(message) => Err(BridgeError::Unreachable(message)),
            None => Ok(()),
        }
    }

    async fn dispatch(
        &self,
        request: &BridgeRequest,
        channel: Channel,
        _sink: Arc<Correlator>,
    ) -> Result<(), BridgeError> {
        self.dispatched.lock().push((request.clone(), channel));
        if self.hang_dispatch.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let error = self.dispatch_error.lock().clone();
        match error {
            Some(message) => Err(BridgeError::Endpoint(message)),
            None => Ok(()),
        }
    }
}
