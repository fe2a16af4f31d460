//! Pending call store.
//!
//! Binds each dispatched call to exactly one asynchronous completion. Every
//! call gets its own `CallId`, which travels in the wire payload and comes
//! back on whichever channel the endpoint answers on.
//!
//! Flow:
//! 1. The service calls `register()` and gets an id plus a oneshot receiver
//! 2. The request is dispatched with that id
//! 3. The callback route (or the simulated transport) calls `complete()`
//! 4. The service awaits the receiver under its per-call deadline

use crate::models::{CallId, Channel};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Payload on success, endpoint message on failure.
pub type CallOutcome = Result<String, String>;

struct PendingCall {
    sender: oneshot::Sender<CallOutcome>,
    channel: Channel,
    method: String,
    seq: u64,
    created_at: Instant,
}

#[derive(Debug, Default)]
pub struct CorrelatorStats {
    pub registered: AtomicU64,
    pub completed: AtomicU64,
    /// Callbacks for ids that were unknown or already settled.
    pub late: AtomicU64,
    pub timed_out: AtomicU64,
    /// Completions whose caller had already gone away.
    pub abandoned: AtomicU64,
}

/// Handle returned by `register()`.
pub struct PendingHandle {
    pub id: CallId,
    pub receiver: oneshot::Receiver<CallOutcome>,
}

pub struct Correlator {
    pending: DashMap<CallId, PendingCall>,
    next_seq: AtomicU64,
    stats: CorrelatorStats,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_seq: AtomicU64::new(0),
            stats: CorrelatorStats::default(),
        }
    }

    /// Register a call waiting on `channel`.
    pub fn register(&self, channel: Channel, method: &str) -> PendingHandle {
        let id = CallId::new();
        let (sender, receiver) = oneshot::channel();

        self.pending.insert(
            id,
            PendingCall {
                sender,
                channel,
                method: method.to_string(),
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                created_at: Instant::now(),
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        debug!(call_id = %id, channel = %channel, method, "Registered pending call");

        PendingHandle { id, receiver }
    }

    /// Complete the call `id` with an outcome delivered on `channel`.
    ///
    /// The error channel may settle any call; the response and state channels
    /// only settle calls registered on them. Returns false when nothing was
    /// completed.
    pub fn complete(&self, id: CallId, channel: Channel, outcome: CallOutcome) -> bool {
        let removed = self
            .pending
            .remove_if(&id, |_, call| channel == Channel::Error || call.channel == channel);

        let Some((_, call)) = removed else {
            if let Some(call) = self.pending.get(&id) {
                warn!(
                    call_id = %id,
                    expected = %call.channel,
                    received = %channel,
                    "Callback arrived on the wrong channel"
                );
            } else {
                self.stats.late.fetch_add(1, Ordering::Relaxed);
                warn!(call_id = %id, channel = %channel, "Callback for unknown or settled call");
            }
            return false;
        };

        let elapsed_ms = call.created_at.elapsed().as_millis();
        match call.sender.send(outcome) {
            Ok(()) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    call_id = %id,
                    channel = %channel,
                    method = call.method,
                    elapsed_ms,
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
                debug!(call_id = %id, method = call.method, "Caller dropped before completion");
                false
            }
        }
    }

    /// Complete the oldest call waiting on `channel`, for callbacks that carry
    /// no id. On the error channel this is the oldest call of any kind.
    pub fn complete_oldest(&self, channel: Channel, outcome: CallOutcome) -> bool {
        let oldest = self
            .pending
            .iter()
            .filter(|entry| channel == Channel::Error || entry.channel == channel)
            .min_by_key(|entry| entry.seq)
            .map(|entry| *entry.key());

        match oldest {
            Some(id) => self.complete(id, channel, outcome),
            None => {
                self.stats.late.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %channel, "Callback without id and no call waiting");
                false
            }
        }
    }

    /// Drop a call whose deadline expired. Later callbacks for it are ignored.
    pub fn cancel(&self, id: CallId) -> bool {
        match self.pending.remove(&id) {
            Some((_, call)) => {
                self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                warn!(
                    call_id = %id,
                    method = call.method,
                    elapsed_ms = call.created_at.elapsed().as_millis(),
                    "Pending call expired"
                );
                true
            }
            None => false,
        }
    }

    /// Forget a call that never reached the endpoint.
    pub fn discard(&self, id: CallId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Fail every pending call with `message`. Returns how many were settled.
    pub fn drain(&self, message: &str) -> usize {
        let ids: Vec<CallId> = self.pending.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter(|id| self.complete(*id, Channel::Error, Err(message.to_string())))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }
}
