//! Pending Call Store - the table that joins replies to waiting callers.
//!
//! Maps correlation IDs to parked callers. Removal from the map is the only
//! arbitration point between the reply listener and a call's timer: whoever
//! removes the entry decides the outcome, the other side is a no-op.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_bus::BusMessage;
use shared_types::{CorrelationId, Operation};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A call waiting for its reply
struct PendingCall {
    /// Channel to hand the reply to the caller
    sender: oneshot::Sender<BusMessage>,
    /// When the call was registered
    created_at: Instant,
    /// Operation (for logging)
    operation: Operation,
}

/// Counters for the pending call store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls completed by a reply
    pub total_completed: AtomicU64,
    /// Total calls expired by their timer
    pub total_timeouts: AtomicU64,
    /// Total calls abandoned (publish failure, dropped caller, shutdown)
    pub total_cancelled: AtomicU64,
}

/// Point-in-time view of the store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub pending: usize,
}

/// Pending call store.
///
/// Flow:
/// 1. Caller calls `register()` to get a correlation ID and a oneshot receiver
/// 2. Caller publishes the request carrying that correlation ID
/// 3. Reply listener receives the reply and calls `complete()`
/// 4. Caller awaits the receiver; on deadline it calls `expire()`
#[derive(Default)]
pub struct PendingCallStore {
    /// Map of correlation ID to pending call
    pending: DashMap<CorrelationId, PendingCall>,
    /// Statistics
    stats: PendingStats,
}

impl PendingCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending call and get a receiver for its reply.
    ///
    /// The returned correlation ID is unique among the calls currently
    /// pending in this store.
    pub fn register(
        &self,
        operation: Operation,
        timeout: Duration,
    ) -> (CorrelationId, oneshot::Receiver<BusMessage>) {
        let (tx, rx) = oneshot::channel();
        let call = PendingCall {
            sender: tx,
            created_at: Instant::now(),
            operation,
        };

        let correlation_id = loop {
            let candidate = CorrelationId::new();
            match self.pending.entry(candidate) {
                Entry::Vacant(slot) => {
                    slot.insert(call);
                    break candidate;
                }
                Entry::Occupied(_) => {
                    warn!(correlation_id = %candidate, "Correlation ID collision, regenerating");
                }
            }
        };
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            operation = %operation,
            timeout_ms = timeout.as_millis() as u64,
            "Registered pending call"
        );

        (correlation_id, rx)
    }

    /// Complete a pending call with its reply.
    ///
    /// Returns true if a waiting caller received the reply; false if the ID
    /// is unknown, already resolved, or the caller has gone away.
    pub fn complete(&self, correlation_id: CorrelationId, reply: BusMessage) -> bool {
        let Some((_, call)) = self.pending.remove(&correlation_id) else {
            debug!(
                correlation_id = %correlation_id,
                "Reply for unknown or already resolved correlation ID"
            );
            return false;
        };

        let response_time = call.created_at.elapsed();
        match call.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    operation = %call.operation,
                    response_time_ms = response_time.as_millis() as u64,
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    operation = %call.operation,
                    "Pending call receiver dropped"
                );
                false
            }
        }
    }

    /// Resolve a call as timed out.
    ///
    /// Returns false if the reply listener already removed the entry, in
    /// which case the reply is on its way to the caller.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        let Some((_, call)) = self.pending.remove(correlation_id) else {
            return false;
        };
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            correlation_id = %correlation_id,
            operation = %call.operation,
            elapsed_ms = call.created_at.elapsed().as_millis() as u64,
            "Pending call timed out"
        );
        true
    }

    /// Cancel a pending call.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop every pending call. Waiting callers observe a closed channel.
    ///
    /// Returns the number of calls dropped.
    pub fn clear(&self) -> usize {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|e| *e.key()).collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    /// Get number of currently pending calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get raw statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    /// Snapshot of counters and current size.
    pub fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            registered: self.stats.total_registered.load(Ordering::Relaxed),
            completed: self.stats.total_completed.load(Ordering::Relaxed),
            timed_out: self.stats.total_timeouts.load(Ordering::Relaxed),
            cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
            pending: self.pending.len(),
        }
    }
}

/// Removes a call from the store if its caller goes away before it resolves.
pub struct PendingGuard<'a> {
    store: &'a PendingCallStore,
    correlation_id: CorrelationId,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    pub fn new(store: &'a PendingCallStore, correlation_id: CorrelationId) -> Self {
        Self {
            store,
            correlation_id,
            armed: true,
        }
    }

    /// The call resolved; leave the table alone on drop.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.store.cancel(&self.correlation_id) {
            debug!(correlation_id = %self.correlation_id, "Abandoned pending call removed");
        }
    }
}
