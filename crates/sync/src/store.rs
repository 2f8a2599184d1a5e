// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Persistent queue store.
//!
//! The whole queue is serialized as one JSON document under one storage key.
//! Two failure rules shape this module:
//!
//! - A corrupt or unreadable document loads as an empty queue (logged, never
//!   surfaced): losing a malformed queue beats crashing startup.
//! - A failed save is logged and swallowed: the in-memory queue stays
//!   authoritative for the process lifetime, at the cost that a process kill
//!   before the next successful save can lose unsynced ops. Known tradeoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eddy_core::QueuedOp;

use crate::error::Error;
use crate::traits::KeyValueStore;

/// Storage key the coordinator persists the queue under by default.
pub const DEFAULT_QUEUE_KEY: &str = "eddy.queue.v1";

/// Version tag written into every persisted document.
pub const QUEUE_DOC_VERSION: u32 = 1;

/// A queued op plus its retry bookkeeping.
///
/// Attempts and backoff deadlines persist with the op so a process restart
/// does not reset a hot-failing op to an immediate retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    pub op: QueuedOp,
    /// Delivery attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Earliest wall-clock millis at which the next attempt may run.
    #[serde(default)]
    pub not_before_ms: u64,
}

impl PendingOp {
    /// Wraps a freshly enqueued op (no attempts, immediately eligible).
    pub fn new(op: QueuedOp) -> Self {
        PendingOp {
            op,
            attempts: 0,
            not_before_ms: 0,
        }
    }

    /// Whether this op may be attempted at `now_ms`.
    pub fn eligible(&self, now_ms: u64) -> bool {
        now_ms >= self.not_before_ms
    }
}

/// An op quarantined after exhausting its allowed attempts.
///
/// Dead letters are surfaced through the queue's introspection API rather
/// than retried forever silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadOp {
    pub op: QueuedOp,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
    pub last_error: String,
}

/// The persisted representation of the whole queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDoc {
    pub version: u32,
    pub pending: Vec<PendingOp>,
    #[serde(default)]
    pub dead: Vec<DeadOp>,
}

impl Default for QueueDoc {
    fn default() -> Self {
        QueueDoc {
            version: QUEUE_DOC_VERSION,
            pending: Vec::new(),
            dead: Vec::new(),
        }
    }
}

/// Durable persistence for the mutation queue.
///
/// Owned exclusively by the queue; no other component reads or writes the
/// document.
pub struct QueueStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl QueueStore {
    /// Creates a store persisting under `key` in the given KV store.
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        QueueStore {
            kv,
            key: key.into(),
        }
    }

    /// Loads the persisted queue document.
    ///
    /// Absent, unreadable, or corrupt documents all load as empty.
    pub async fn load(&self) -> QueueDoc {
        let raw = match self.kv.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return QueueDoc::default(),
            Err(e) => {
                let error = Error::Persistence(e);
                tracing::warn!(key = %self.key, error = %error, "queue load failed, starting empty");
                return QueueDoc::default();
            }
        };

        match serde_json::from_str::<QueueDoc>(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                let error = Error::Codec(e);
                tracing::warn!(
                    key = %self.key,
                    error = %error,
                    "persisted queue is corrupt, discarding"
                );
                QueueDoc::default()
            }
        }
    }

    /// Persists the given document, overwriting the previous one.
    ///
    /// Failures are logged and swallowed; the caller's in-memory state stays
    /// authoritative.
    pub async fn save(&self, doc: &QueueDoc) {
        let raw = match serde_json::to_string(doc) {
            Ok(raw) => raw,
            Err(e) => {
                let error = Error::Codec(e);
                tracing::warn!(key = %self.key, error = %error, "queue serialize failed, skipping save");
                return;
            }
        };

        if let Err(e) = self.kv.set(&self.key, raw).await {
            let error = Error::Persistence(e);
            tracing::warn!(
                key = %self.key,
                error = %error,
                pending = doc.pending.len(),
                "queue save failed, in-memory queue remains authoritative"
            );
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
