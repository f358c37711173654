//! Long-polling notification manager.
//!
//! Clients block on a check call until something changes about an
//! applicant's unresolved role requests, bounded by a timeout. The registry
//! is an explicit injectable object, process-local by design; it gives no
//! cross-node delivery guarantee, so callers must stay affinitized to the
//! node holding their subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::services::request::RoleRequestStore;
use crate::types::{
    IdentityId, OperationResult, OperationState, RoleRequestId, RoleRequestState,
    WatchedEntityType,
};

/// Default client-facing timeout for a single check call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Subscriber table key.
pub type SubscriberKey = (WatchedEntityType, Uuid);

/// Aggregate view of an applicant's unresolved requests; two equal
/// snapshots mean nothing observable changed between them.
type Snapshot = Vec<(RoleRequestId, RoleRequestState)>;

struct Subscriber {
    ticket: u64,
    snapshot: Snapshot,
    sender: oneshot::Sender<OperationResult>,
}

/// Outcome counters of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Subscribers completed with all requests resolved.
    pub completed_executed: usize,
    /// Subscribers completed with a change that left requests pending.
    pub completed_running: usize,
    /// Abandoned slots dropped because the client went away.
    pub dropped_disconnected: usize,
    /// Whether this pass was skipped because another sweep was running.
    pub skipped: bool,
}

/// Registry of long-poll subscribers with a periodic sweep.
pub struct LongPollingManager {
    request_store: Arc<dyn RoleRequestStore>,
    subscribers: RwLock<HashMap<SubscriberKey, Subscriber>>,
    enabled: AtomicBool,
    // Overlapping sweeps are skipped, never run concurrently.
    sweep_guard: Mutex<()>,
    timeout: Duration,
    next_ticket: AtomicU64,
}

impl LongPollingManager {
    /// Create a manager with the default timeout.
    pub fn new(request_store: Arc<dyn RoleRequestStore>) -> Self {
        Self::with_timeout(request_store, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a manager with an explicit timeout.
    pub fn with_timeout(request_store: Arc<dyn RoleRequestStore>, timeout: Duration) -> Self {
        Self {
            request_store,
            subscribers: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(true),
            sweep_guard: Mutex::new(()),
            timeout,
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Administratively enable or disable long polling.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether long polling is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Block until the applicant's unresolved requests change, the timeout
    /// elapses, or a newer check call supersedes this one.
    ///
    /// Resolves to `Blocked` immediately when long polling is disabled,
    /// `Executed` when all of the applicant's requests are resolved,
    /// `Running` when something changed but work remains, and `NotExecuted`
    /// on timeout or supersession. Clients loop on `NotExecuted`.
    pub async fn check_unresolved_requests(
        &self,
        applicant_id: IdentityId,
    ) -> Result<OperationResult> {
        if !self.is_enabled() {
            return Ok(OperationResult::from_state(OperationState::Blocked));
        }

        let key = (WatchedEntityType::Identity, applicant_id.into_inner());
        let snapshot = self.snapshot(applicant_id).await?;
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = oneshot::channel();

        let superseded = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(
                key,
                Subscriber {
                    ticket,
                    snapshot,
                    sender,
                },
            )
        };
        if let Some(old) = superseded {
            // At most one outstanding check per applicant; the older caller
            // is told to retry.
            debug!(applicant_id = %applicant_id, "Superseding previous long-poll subscriber");
            let _ = old
                .sender
                .send(OperationResult::from_state(OperationState::NotExecuted));
        }

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(result)) => Ok(result),
            // Sender dropped without completing; treat as no change.
            Ok(Err(_)) => Ok(OperationResult::from_state(OperationState::NotExecuted)),
            Err(_) => {
                let mut subscribers = self.subscribers.write().await;
                // Deregister only our own slot; a newer subscriber under the
                // same key stays registered.
                if subscribers.get(&key).is_some_and(|s| s.ticket == ticket) {
                    subscribers.remove(&key);
                }
                Ok(OperationResult::from_state(OperationState::NotExecuted))
            }
        }
    }

    /// One sweep pass over all subscribers.
    ///
    /// Re-snapshots each watched applicant and completes the subscriber on
    /// any observable change. Called periodically by a background job.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepStats> {
        let mut stats = SweepStats::default();
        let Ok(_guard) = self.sweep_guard.try_lock() else {
            stats.skipped = true;
            return Ok(stats);
        };

        let keys: Vec<SubscriberKey> = self.subscribers.read().await.keys().copied().collect();
        for key in keys {
            let (WatchedEntityType::Identity, raw_id) = key;
            let applicant_id = IdentityId::from(raw_id);
            let current = self.snapshot(applicant_id).await?;

            let mut subscribers = self.subscribers.write().await;
            let Some(subscriber) = subscribers.get(&key) else {
                continue;
            };

            if subscriber.sender.is_closed() {
                subscribers.remove(&key);
                stats.dropped_disconnected += 1;
                continue;
            }
            if current == subscriber.snapshot {
                continue;
            }

            let state = if current.is_empty() {
                OperationState::Executed
            } else {
                OperationState::Running
            };
            if let Some(completed) = subscribers.remove(&key) {
                let _ = completed.sender.send(OperationResult::from_state(state));
                match state {
                    OperationState::Executed => stats.completed_executed += 1,
                    _ => stats.completed_running += 1,
                }
            }
        }

        Ok(stats)
    }

    async fn snapshot(&self, applicant_id: IdentityId) -> Result<Snapshot> {
        Ok(self
            .request_store
            .list_unresolved_by_applicant(applicant_id)
            .await?
            .into_iter()
            .map(|r| (r.id, r.state))
            .collect())
    }
}
