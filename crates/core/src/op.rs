// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Queued write operations.
//!
//! Every write the app makes while offline (or racing connectivity) becomes a
//! [`QueuedOp`]: a kind (create/update/delete), a typed payload keyed by
//! collection, and a timestamp. Ops are designed to be:
//!
//! - Serializable: the queue persists them across process restarts
//! - Idempotent: the backend applies them as upsert-by-id / delete-by-id,
//!   so replaying an op after a crash has the same effect as applying it once
//!
//! Payloads are a tagged union rather than opaque JSON so that remote-verb
//! dispatch (collection name, record id) is exhaustively checked.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clock::ClockSource;
use crate::error::{Error, Result};
use crate::records::{MessageRecord, PartyRecord, ProfileRecord, VouchRecord};

/// Unique identifier for a queued operation.
///
/// Format: `{wall_ms}-{hash}` where hash is the first 8 hex chars of
/// SHA256(wall_ms, counter, collection, record id). Opaque to everything
/// except logs, where the leading millis make ids scannable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    /// Wraps an existing id string (used when restoring persisted ops).
    pub fn from_string(s: String) -> Self {
        OpId(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates unique operation ids for the lifetime of a queue.
///
/// Combines the wall clock with a per-process counter so two enqueues within
/// the same millisecond still get distinct ids.
pub struct IdSource {
    clock: Arc<dyn ClockSource>,
    counter: AtomicU32,
}

impl IdSource {
    /// Creates an id source backed by the given clock.
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        IdSource {
            clock,
            counter: AtomicU32::new(0),
        }
    }

    /// Allocates a fresh id for an op targeting the given payload.
    pub fn next(&self, payload: &OpPayload) -> OpId {
        let wall_ms = self.clock.now_ms();
        let seq = self.counter.fetch_add(1, AtomicOrdering::SeqCst);
        let input = format!(
            "{wall_ms}:{seq}:{}:{}",
            payload.collection(),
            payload.record_id()
        );
        let hash = Sha256::digest(input.as_bytes());
        OpId(format!("{wall_ms}-{}", hex::encode(&hash[..4])))
    }
}

/// The verb a queued op applies against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Insert (upsert-by-id) a record.
    Create,
    /// Update a record by id.
    Update,
    /// Delete a record by id (tolerant of "already gone").
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(OpKind::Create),
            "update" => Ok(OpKind::Update),
            "delete" => Ok(OpKind::Delete),
            other => Err(Error::InvalidOpKind(other.to_string())),
        }
    }
}

/// Typed payload of a queued op, tagged by target collection.
///
/// The serialized tag doubles as the backend collection name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum OpPayload {
    Parties(PartyRecord),
    Messages(MessageRecord),
    Vouches(VouchRecord),
    Profiles(ProfileRecord),
}

impl OpPayload {
    /// The backend collection this payload targets.
    pub fn collection(&self) -> &'static str {
        match self {
            OpPayload::Parties(_) => "parties",
            OpPayload::Messages(_) => "messages",
            OpPayload::Vouches(_) => "vouches",
            OpPayload::Profiles(_) => "profiles",
        }
    }

    /// The id of the record this payload carries.
    ///
    /// Update and delete dispatch is keyed on this.
    pub fn record_id(&self) -> &str {
        match self {
            OpPayload::Parties(r) => &r.id,
            OpPayload::Messages(r) => &r.id,
            OpPayload::Vouches(r) => &r.id,
            OpPayload::Profiles(r) => &r.id,
        }
    }

    /// Serializes the inner record as the row sent to the backend.
    ///
    /// The collection tag is not part of the row.
    pub fn to_row(&self) -> Result<serde_json::Value> {
        let row = match self {
            OpPayload::Parties(r) => serde_json::to_value(r)?,
            OpPayload::Messages(r) => serde_json::to_value(r)?,
            OpPayload::Vouches(r) => serde_json::to_value(r)?,
            OpPayload::Profiles(r) => serde_json::to_value(r)?,
        };
        Ok(row)
    }
}

/// A write operation waiting for delivery to the backend.
///
/// Created by a caller action, persisted immediately, removed only after a
/// confirmed remote application. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOp {
    /// Unique id for the lifetime of the queue.
    pub id: OpId,
    /// The remote verb to apply.
    pub kind: OpKind,
    /// The typed record payload.
    pub payload: OpPayload,
    /// When the op was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedOp {
    /// The backend collection this op targets.
    pub fn collection(&self) -> &'static str {
        self.payload.collection()
    }

    /// The record id this op targets.
    pub fn record_id(&self) -> &str {
        self.payload.record_id()
    }
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
