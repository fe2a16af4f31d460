use crate::models::BridgeState;
use crate::transport::BridgeTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct GateInner {
    state: BridgeState,
    last_error: Option<String>,
}

/// One run of the handshake. Dropping it unfinished, for example when the
/// caller's future is cancelled, leaves the gate `Failed` instead of stuck in
/// `Initializing`.
struct InitAttempt<'a> {
    inner: &'a Mutex<GateInner>,
    finished: bool,
}

impl InitAttempt<'_> {
    fn finish(mut self, outcome: Result<(), String>) -> BridgeState {
        self.finished = true;

        let mut inner = self.inner.lock();
        match outcome {
            Ok(()) => {
                inner.state = BridgeState::Ready;
                tracing::info!("Bridge ready");
            }
            Err(e) => {
                tracing::error!("Bridge initialization failed: {}", e);
                inner.state = BridgeState::Failed;
                inner.last_error = Some(e);
            }
        }
        inner.state
    }
}

impl Drop for InitAttempt<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == BridgeState::Initializing {
            tracing::warn!("Bridge initialization cancelled");
            inner.state = BridgeState::Failed;
            inner.last_error = Some("initialization cancelled".to_string());
        }
    }
}

/// Holds every contract call behind the one-time endpoint handshake.
///
/// `Uninitialized -> Initializing -> Ready | Failed`. A failed gate stays
/// failed until `initialize()` is called again.
pub struct InitializationGate {
    transport: Arc<dyn BridgeTransport>,
    inner: Mutex<GateInner>,
    wait_ceiling: Duration,
    poll_interval: Duration,
}

impl InitializationGate {
    pub fn new(
        transport: Arc<dyn BridgeTransport>,
        wait_ceiling: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            inner: Mutex::new(GateInner {
                state: BridgeState::Uninitialized,
                last_error: None,
            }),
            wait_ceiling,
            poll_interval,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.inner.lock().state
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn wait_ceiling(&self) -> Duration {
        self.wait_ceiling
    }

    /// Run the endpoint handshake unless it already ran or is running.
    ///
    /// The handshake is bounded by the wait ceiling; past it no caller would
    /// still be waiting.
    ///
    /// Returns the state as seen by this caller: a concurrent second caller
    /// gets `Initializing` back without touching the transport.
    pub async fn initialize(&self) -> BridgeState {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                BridgeState::Ready | BridgeState::Initializing => {
                    tracing::debug!(state = %inner.state, "Bridge initialization already handled");
                    return inner.state;
                }
                BridgeState::Uninitialized | BridgeState::Failed => {
                    inner.state = BridgeState::Initializing;
                    inner.last_error = None;
                }
            }
        }

        let attempt = InitAttempt {
            inner: &self.inner,
            finished: false,
        };

        tracing::info!(mode = self.transport.mode().as_str(), "Bridge initializing");

        let setup = tokio::time::timeout(self.wait_ceiling, self.transport.setup());
        let outcome = match setup.await {
            Ok(outcome) => outcome.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "bridge setup timed out after {}ms",
                self.wait_ceiling.as_millis()
            )),
        };

        attempt.finish(outcome)
    }

    /// Poll until the bridge is ready.
    ///
    /// Returns false once `max_wait` elapses or the gate has failed. Never
    /// sleeps past the ceiling.
    pub async fn wait_until_ready(&self, max_wait: Duration) -> bool {
        let started = Instant::now();

        loop {
            match self.state() {
                BridgeState::Ready => return true,
                BridgeState::Failed => {
                    tracing::debug!("Bridge failed to initialize, skipping wait");
                    return false;
                }
                BridgeState::Uninitialized | BridgeState::Initializing => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                tracing::warn!(
                    waited_ms = elapsed.as_millis() as u64,
                    state = %self.state(),
                    "Bridge not ready within ceiling"
                );
                return false;
            }

            tokio::time::sleep(self.poll_interval.min(max_wait - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    fn gate(transport: Arc<ScriptedTransport>) -> InitializationGate {
        InitializationGate::new(transport, Duration::from_secs(10), Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_initialize_runs_setup_once() {
        let transport = Arc::new(ScriptedTransport::with_setup_delay(Duration::from_millis(500)));
        let gate = gate(transport.clone());

        let (first, second) = tokio::join!(gate.initialize(), gate.initialize());

        assert_eq!(first, BridgeState::Ready);
        assert_eq!(second, BridgeState::Initializing);
        assert_eq!(transport.setup_calls(), 1);

        assert_eq!(gate.initialize().await, BridgeState::Ready);
        assert_eq!(transport.setup_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_setup_needs_explicit_retry() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.fail_setup("endpoint script missing");
        let gate = gate(transport.clone());

        assert_eq!(gate.initialize().await, BridgeState::Failed);
        assert!(gate.last_error().unwrap().contains("endpoint script missing"));

        let started = Instant::now();
        assert!(!gate.wait_until_ready(Duration::from_secs(10)).await);
        assert!(started.elapsed() < Duration::from_millis(100));

        transport.succeed_setup();
        assert_eq!(gate.initialize().await, BridgeState::Ready);
        assert_eq!(gate.last_error(), None);
        assert_eq!(transport.setup_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_within_ceiling() {
        let gate = gate(Arc::new(ScriptedTransport::default()));
        let ceiling = Duration::from_secs(10);

        let started = Instant::now();
        assert!(!gate.wait_until_ready(ceiling).await);

        let waited = started.elapsed();
        assert!(waited >= ceiling);
        assert!(waited <= ceiling + Duration::from_millis(100));
        assert_eq!(gate.state(), BridgeState::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_once_ready() {
        let transport = Arc::new(ScriptedTransport::with_setup_delay(Duration::from_secs(2)));
        let gate = Arc::new(gate(transport));

        let init = tokio::spawn({
            let gate = gate.clone();
            async move { gate.initialize().await }
        });

        let started = Instant::now();
        assert!(gate.wait_until_ready(Duration::from_secs(10)).await);
        assert!(started.elapsed() < Duration::from_millis(2200));
        assert_eq!(init.await.unwrap(), BridgeState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_initialize_can_be_retried() {
        let transport = Arc::new(ScriptedTransport::with_setup_delay(Duration::from_secs(1)));
        let gate = Arc::new(gate(transport.clone()));

        let init = tokio::spawn({
            let gate = gate.clone();
            async move { gate.initialize().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(gate.state(), BridgeState::Initializing);

        init.abort();
        assert!(init.await.unwrap_err().is_cancelled());

        assert_eq!(gate.state(), BridgeState::Failed);
        assert_eq!(gate.last_error().as_deref(), Some("initialization cancelled"));
        assert!(!gate.wait_until_ready(Duration::from_secs(10)).await);

        assert_eq!(gate.initialize().await, BridgeState::Ready);
        assert_eq!(transport.setup_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_setup_fails_at_ceiling() {
        let transport = Arc::new(ScriptedTransport::with_setup_delay(Duration::from_secs(60)));
        let gate = gate(transport);

        let started = Instant::now();
        assert_eq!(gate.initialize().await, BridgeState::Failed);
        assert!(started.elapsed() <= Duration::from_secs(10) + Duration::from_millis(100));
        assert_eq!(
            gate.last_error().as_deref(),
            Some("bridge setup timed out after 10000ms")
        );
    }
}
