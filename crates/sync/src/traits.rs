// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Collaborator traits the engine consumes.
//!
//! All four seams are injectable so the engine can be tested without a real
//! backend, platform reachability API, or durable store:
//!
//! - [`RemoteStore`]: the backend data service the queue delivers to
//! - [`ChannelFactory`] / [`LiveChannel`]: wire-level live-update channels
//! - [`Reachability`]: platform network status
//! - [`KeyValueStore`]: durable string persistence
//!
//! Methods with real I/O suspension points return boxed futures; channel
//! open/close are deliberately synchronous so the registry can replace a
//! subscription in one critical section (implementations move their wire
//! traffic onto background tasks).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use eddy_core::{ChangeEvent, EventFilter};

/// Error type for remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation (validation, auth, conflict).
    #[error("backend rejected operation: {0}")]
    Rejected(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Backend data service the mutation queue delivers to.
///
/// Verbs must be idempotent: `insert` is upsert-by-id and `delete` tolerates
/// "already gone". The queue retries at-least-once across passes.
pub trait RemoteStore: Send + Sync {
    /// Insert (upsert) a row into a collection.
    fn insert(
        &self,
        collection: &str,
        row: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>>;

    /// Update a row by id.
    fn update(
        &self,
        collection: &str,
        id: &str,
        row: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>>;

    /// Delete a row by id.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>>;
}

/// Error type for durable storage operations.
#[derive(Debug, thiserror::Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

/// Durable string persistence for the serialized queue.
///
/// The engine owns exactly one document under one key; the concrete medium
/// (file, mobile KV store, SQLite cell) is the host app's choice.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>>;

    /// Overwrite the value stored under `key`.
    ///
    /// Must be atomic from the caller's perspective: a crash mid-set may lose
    /// the new value but never exposes a partial write.
    fn set(
        &self,
        key: &str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;
}

/// Error type for reachability probes.
#[derive(Debug, thiserror::Error)]
#[error("reachability probe failed: {0}")]
pub struct ConnectivityError(pub String);

/// Removal guard for a reachability watcher.
///
/// Dropping the guard deregisters the watcher.
pub struct WatchGuard(Option<Box<dyn FnOnce() + Send>>);

impl WatchGuard {
    /// Wraps a deregistration closure.
    pub fn new(remove: Box<dyn FnOnce() + Send>) -> Self {
        WatchGuard(Some(remove))
    }

    /// A guard with nothing to deregister.
    pub fn noop() -> Self {
        WatchGuard(None)
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(remove) = self.0.take() {
            remove();
        }
    }
}

/// Platform network status source.
pub trait Reachability: Send + Sync {
    /// Current reachability. Errors are resolved fail-open by the monitor.
    fn is_connected(&self) -> Result<bool, ConnectivityError>;

    /// Registers a raw status watcher. The returned guard deregisters it.
    fn watch(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> WatchGuard;
}

/// Error type for channel subscription.
#[derive(Debug, thiserror::Error)]
#[error("channel subscribe failed: {0}")]
pub struct SubscribeError(pub String);

/// Callback invoked with every change event a channel delivers.
pub type EventCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// One live wire-level channel.
///
/// Owned exclusively by the registry; never handed to callers.
pub trait LiveChannel: Send {
    /// Request teardown. Must stop event delivery; may complete wire
    /// unsubscription in the background.
    fn close(&mut self);
}

/// Opens live channels against the backend.
pub trait ChannelFactory: Send + Sync {
    /// Open a channel, attach the filter and callback, and start it.
    ///
    /// Synchronous by contract: the registry replaces subscriptions inside a
    /// single critical section, so there must be no awaited gap between
    /// closing an old channel and opening its successor.
    fn open(
        &self,
        channel_name: &str,
        filter: &EventFilter,
        callback: EventCallback,
    ) -> Result<Box<dyn LiveChannel>, SubscribeError>;
}
