// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Mutation queue.
//!
//! Buffers writes destined for the backend and drives their eventual
//! delivery. Delivery is at-least-once: ops are removed only after a
//! confirmed remote application, so the backend verbs must be idempotent.
//!
//! Sync passes are serialized by an explicit state machine
//! (`Idle | Syncing | SyncingWithRerun`). A `sync()` call arriving while a
//! pass is running does not start a second pass; it marks the state so that
//! exactly one coalesced follow-up pass runs when the current one finishes.
//! A mid-pass trigger is therefore never silently lost.
//!
//! Failed ops back off exponentially per op and are quarantined to a
//! dead-letter list after `max_attempts`, surfaced through introspection
//! rather than retried forever.

use std::sync::{Arc, Mutex};

use eddy_core::{now_utc, ClockSource, IdSource, OpId, OpKind, OpPayload, QueuedOp};

use crate::connectivity::ConnectivityMonitor;
use crate::error::Error;
use crate::store::{DeadOp, PendingOp, QueueDoc, QueueStore, QUEUE_DOC_VERSION};
use crate::traits::{RemoteError, RemoteStore};

/// Retry policy for the queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Attempts before an op is quarantined to the dead-letter list.
    pub max_attempts: u32,
    /// Backoff after the first failure (doubles per failure).
    pub initial_backoff_ms: u64,
    /// Cap on the per-op backoff.
    pub max_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_attempts: 8,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 300_000,
        }
    }
}

impl QueueConfig {
    /// Backoff after the given number of failures: `initial * 2^(n-1)`, capped.
    pub fn backoff_ms(&self, attempts: u32) -> u64 {
        let shift = attempts.saturating_sub(1).min(32);
        self.initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms)
    }
}

/// Sync pass state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    Syncing,
    /// A trigger arrived mid-pass; run one more pass when this one finishes.
    SyncingWithRerun,
}

/// In-memory queue of pending write operations.
///
/// Sole owner of the persisted queue document. Constructed once by the
/// coordinator and shared by `Arc`.
pub struct MutationQueue {
    remote: Arc<dyn RemoteStore>,
    store: QueueStore,
    monitor: Arc<ConnectivityMonitor>,
    clock: Arc<dyn ClockSource>,
    ids: IdSource,
    config: QueueConfig,
    runtime: tokio::runtime::Handle,
    pending: Mutex<Vec<PendingOp>>,
    dead: Mutex<Vec<DeadOp>>,
    state: Mutex<SyncState>,
}

impl MutationQueue {
    /// Creates an empty queue. Call [`restore`](Self::restore) to reload
    /// persisted ops before first use.
    ///
    /// Must be called from within a tokio runtime: the handle is captured
    /// here so [`request_sync`](Self::request_sync) can spawn passes from
    /// any thread, including platform reachability watcher threads.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        store: QueueStore,
        monitor: Arc<ConnectivityMonitor>,
        clock: Arc<dyn ClockSource>,
        config: QueueConfig,
    ) -> Arc<Self> {
        Arc::new(MutationQueue {
            remote,
            store,
            monitor,
            ids: IdSource::new(Arc::clone(&clock)),
            clock,
            config,
            runtime: tokio::runtime::Handle::current(),
            pending: Mutex::new(Vec::new()),
            dead: Mutex::new(Vec::new()),
            state: Mutex::new(SyncState::Idle),
        })
    }

    /// Rebuilds the in-memory queue from the persisted document, preserving
    /// order and per-op attempt counts.
    pub async fn restore(&self) {
        let doc = self.store.load().await;
        if !doc.pending.is_empty() || !doc.dead.is_empty() {
            tracing::info!(
                pending = doc.pending.len(),
                dead = doc.dead.len(),
                "restored persisted queue"
            );
        }
        *self.lock_pending() = doc.pending;
        *self.lock_dead() = doc.dead;
    }

    /// Appends a write to the queue and persists it.
    ///
    /// Returns once the op is persisted; delivery is asynchronous. If the
    /// monitor reports online, a sync pass is requested immediately.
    pub async fn enqueue(self: &Arc<Self>, kind: OpKind, payload: OpPayload) -> OpId {
        let id = self.ids.next(&payload);
        let op = QueuedOp {
            id: id.clone(),
            kind,
            payload,
            enqueued_at: now_utc(self.clock.as_ref()),
        };
        tracing::debug!(op = %id, kind = %kind, collection = op.collection(), "enqueue");

        self.lock_pending().push(PendingOp::new(op));
        self.persist().await;

        if self.monitor.is_online() {
            self.request_sync();
        }
        id
    }

    /// Requests a sync pass without waiting for it.
    ///
    /// Safe to call from any thread; the pass runs on the runtime captured
    /// at construction.
    pub fn request_sync(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        self.runtime.spawn(async move {
            queue.sync().await;
        });
    }

    /// Runs sync passes until the queue has been fully attempted.
    ///
    /// Reentrant calls coalesce: if a pass is already running this marks a
    /// rerun and returns immediately.
    pub async fn sync(&self) {
        {
            let mut state = self.lock_state();
            match *state {
                SyncState::Idle => *state = SyncState::Syncing,
                SyncState::Syncing => {
                    *state = SyncState::SyncingWithRerun;
                    return;
                }
                SyncState::SyncingWithRerun => return,
            }
        }

        loop {
            self.run_pass().await;

            let rerun = {
                let mut state = self.lock_state();
                if *state == SyncState::SyncingWithRerun {
                    *state = SyncState::Syncing;
                    true
                } else {
                    *state = SyncState::Idle;
                    false
                }
            };
            if !rerun {
                break;
            }
        }
    }

    /// Number of pending (not dead-lettered) ops.
    pub fn len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Whether the pending queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_pending().is_empty()
    }

    /// Number of quarantined ops.
    pub fn dead_letter_count(&self) -> usize {
        self.lock_dead().len()
    }

    /// Snapshot of the quarantined ops, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadOp> {
        self.lock_dead().clone()
    }

    /// Re-arms every dead-lettered op for delivery and requests a sync pass
    /// if online. Returns the number of ops re-armed.
    pub async fn retry_dead_letters(self: &Arc<Self>) -> usize {
        let revived: Vec<PendingOp> = self
            .lock_dead()
            .drain(..)
            .map(|dead| PendingOp::new(dead.op))
            .collect();
        let count = revived.len();
        if count == 0 {
            return 0;
        }

        tracing::info!(count, "re-arming dead-lettered ops");
        self.lock_pending().extend(revived);
        self.persist().await;

        if self.monitor.is_online() {
            self.request_sync();
        }
        count
    }

    /// Discards every pending and dead-lettered op.
    ///
    /// Destructive: unsynced work is lost. Intended for sign-out.
    pub async fn clear(&self) {
        let dropped = {
            let mut pending = self.lock_pending();
            let n = pending.len();
            pending.clear();
            n
        };
        self.lock_dead().clear();
        if dropped > 0 {
            tracing::info!(dropped, "queue cleared, unsynced ops discarded");
        }
        self.persist().await;
    }

    /// One sync pass: snapshot the queue and attempt every eligible op in
    /// enqueue order. Per-op outcomes are independent; a failure does not
    /// block later ops.
    async fn run_pass(&self) {
        let now_ms = self.clock.now_ms();
        let snapshot: Vec<PendingOp> = self.lock_pending().clone();
        if snapshot.is_empty() {
            return;
        }

        let mut changed = false;
        for entry in &snapshot {
            if !entry.eligible(now_ms) {
                continue;
            }

            match self.attempt(&entry.op).await {
                Ok(()) => {
                    tracing::debug!(op = %entry.op.id, "delivered");
                    self.lock_pending().retain(|p| p.op.id != entry.op.id);
                    changed = true;
                }
                Err(e) => {
                    let error = Error::Remote {
                        kind: remote_verb(entry.op.kind),
                        collection: entry.op.collection(),
                        record_id: entry.op.record_id().to_string(),
                        source: e,
                    };
                    tracing::warn!(
                        op = %entry.op.id,
                        error = %error,
                        "delivery failed, retaining for retry"
                    );
                    self.record_failure(&entry.op.id, now_ms, &error);
                    changed = true;
                }
            }
        }

        if changed {
            self.persist().await;
        }
    }

    /// Applies the remote verb corresponding to an op's kind.
    async fn attempt(&self, op: &QueuedOp) -> Result<(), RemoteError> {
        let collection = op.collection();
        match op.kind {
            OpKind::Create => {
                let row = self.row_for(op)?;
                self.remote.insert(collection, row).await
            }
            OpKind::Update => {
                let row = self.row_for(op)?;
                self.remote.update(collection, op.record_id(), row).await
            }
            OpKind::Delete => self.remote.delete(collection, op.record_id()).await,
        }
    }

    fn row_for(&self, op: &QueuedOp) -> Result<serde_json::Value, RemoteError> {
        op.payload
            .to_row()
            .map_err(|e| RemoteError::Rejected(format!("unserializable payload: {e}")))
    }

    /// Bumps an op's attempt count, scheduling backoff or quarantining it.
    fn record_failure(&self, id: &OpId, now_ms: u64, error: &Error) {
        let mut pending = self.lock_pending();
        let Some(index) = pending.iter().position(|p| &p.op.id == id) else {
            // Cleared concurrently; nothing to record.
            return;
        };

        pending[index].attempts = pending[index].attempts.saturating_add(1);
        let attempts = pending[index].attempts;

        if attempts >= self.config.max_attempts {
            let entry = pending.remove(index);
            drop(pending);
            tracing::warn!(
                op = %entry.op.id,
                attempts,
                error = %error,
                "op exhausted attempts, moving to dead letters"
            );
            self.lock_dead().push(DeadOp {
                op: entry.op,
                attempts,
                failed_at: now_utc(self.clock.as_ref()),
                last_error: error.to_string(),
            });
        } else {
            pending[index].not_before_ms = now_ms.saturating_add(self.config.backoff_ms(attempts));
        }
    }

    /// Persists the current queue. Save failures are logged by the store;
    /// in-memory state stays authoritative.
    async fn persist(&self) {
        let doc = QueueDoc {
            version: QUEUE_DOC_VERSION,
            pending: self.lock_pending().clone(),
            dead: self.lock_dead().clone(),
        };
        self.store.save(&doc).await;
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<PendingOp>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_dead(&self) -> std::sync::MutexGuard<'_, Vec<DeadOp>> {
        self.dead.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn remote_verb(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Create => "insert",
        OpKind::Update => "update",
        OpKind::Delete => "delete",
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
