// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! eddy-sync: offline-first sync engine.
//!
//! Buffers app writes while disconnected, replays them once connectivity
//! returns, and keeps exactly one live-update channel per logical key.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  enqueue   ┌───────────────┐  insert/update/delete
//! │  app writes  │───────────►│ MutationQueue │──────────────────────► RemoteStore
//! └──────────────┘            └───────┬───────┘
//!                                     │ save/load
//!                             ┌───────▼───────┐
//!                             │  QueueStore   │──────► KeyValueStore
//!                             └───────────────┘
//!
//! ┌────────────────────┐  came-online edge  ┌───────────────┐
//! │ConnectivityMonitor │───────────────────►│SyncCoordinator│──► queue.sync()
//! └────────────────────┘                    └───────────────┘
//!
//! ┌─────────────────────┐  open/close   ┌────────────────┐
//! │SubscriptionRegistry │──────────────►│ ChannelFactory │──► ChangeEvent callbacks
//! └─────────────────────┘               └────────────────┘
//! ```
//!
//! Delivery is at-least-once, not exactly-once: the same op may be attempted
//! across multiple passes if persistence raced a process restart, so remote
//! verbs must be idempotent (upsert-by-id, delete tolerant of "already gone").
//!
//! The engine is wired once by [`SyncCoordinator`]; there is no global state.

pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod kv;
pub mod queue;
pub mod registry;
pub mod store;
pub mod traits;

pub use connectivity::{ConnectivityMonitor, ListenerGuard, Transition};
pub use coordinator::{CoordinatorConfig, SyncCoordinator};
pub use error::{Error, Result};
pub use kv::{FileStore, MemoryStore};
pub use queue::{MutationQueue, QueueConfig};
pub use registry::{SubscriptionRegistry, Unsubscribe};
pub use store::{DeadOp, PendingOp, QueueDoc, QueueStore, DEFAULT_QUEUE_KEY};
pub use traits::{
    ChannelFactory, ConnectivityError, EventCallback, KeyValueStore, LiveChannel, Reachability,
    RemoteError, RemoteStore, StorageError, SubscribeError, WatchGuard,
};

#[cfg(test)]
mod test_helpers;
