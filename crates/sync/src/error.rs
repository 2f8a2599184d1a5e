// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Error taxonomy for the sync engine.
//!
//! No error from the engine's background paths reaches callers as an
//! unhandled failure: persistence and remote errors degrade to "keep trying
//! later" plus a tracing record, and subscription failures degrade to a no-op
//! unsubscribe. The variants here exist for the few caller-facing surfaces
//! and for log context.

use thiserror::Error;

use crate::traits::{ConnectivityError, RemoteError, StorageError, SubscribeError};

/// All possible errors that can occur in the sync engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Read or write of the durable store failed. Non-fatal; in-memory state
    /// remains authoritative for the process lifetime.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),

    /// A single queued op failed to apply remotely. Non-fatal; the op is
    /// retained (with backoff) for a later pass.
    #[error("remote {kind} on {collection}/{record_id} failed: {source}")]
    Remote {
        kind: &'static str,
        collection: &'static str,
        record_id: String,
        #[source]
        source: RemoteError,
    },

    /// The reachability check itself failed. Resolved fail-open.
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// Channel open/subscribe failed. Never propagates past the registry.
    #[error("subscription '{key}' failed: {source}")]
    Subscription {
        key: String,
        #[source]
        source: SubscribeError,
    },

    /// The persisted queue document could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A specialized Result type for sync engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
