// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Sync coordinator.
//!
//! Thin composition root: constructs the monitor, queue, and registry as
//! explicit instances (no global singletons), restores the persisted queue,
//! and wires the offline-to-online edge to a sync trigger.

use std::sync::{Arc, Mutex};

use eddy_core::ClockSource;

use crate::connectivity::{ConnectivityMonitor, ListenerGuard, Transition};
use crate::queue::{MutationQueue, QueueConfig};
use crate::registry::SubscriptionRegistry;
use crate::store::{QueueStore, DEFAULT_QUEUE_KEY};
use crate::traits::{ChannelFactory, KeyValueStore, Reachability, RemoteStore};

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Retry policy for the mutation queue.
    pub queue: QueueConfig,
    /// Storage key the queue document is persisted under.
    pub queue_key: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            queue: QueueConfig::default(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
        }
    }
}

/// Owns the engine's components and the wiring between them.
pub struct SyncCoordinator {
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<MutationQueue>,
    registry: Arc<SubscriptionRegistry>,
    /// Keeps the came-online listener registered until shutdown.
    edge_listener: Mutex<Option<ListenerGuard>>,
}

impl SyncCoordinator {
    /// Builds and wires the engine.
    ///
    /// Restores the persisted queue, registers the came-online trigger, and
    /// - if there is restored work and we are already online - requests an
    /// initial sync pass to drain the backlog.
    pub async fn start(
        remote: Arc<dyn RemoteStore>,
        kv: Arc<dyn KeyValueStore>,
        reachability: Arc<dyn Reachability>,
        channels: Arc<dyn ChannelFactory>,
        clock: Arc<dyn ClockSource>,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        let monitor = ConnectivityMonitor::new(reachability);
        let store = QueueStore::new(kv, config.queue_key);
        let queue = MutationQueue::new(
            remote,
            store,
            Arc::clone(&monitor),
            clock,
            config.queue,
        );
        queue.restore().await;
        let registry = SubscriptionRegistry::new(channels);

        let guard = monitor.on_change({
            let queue = Arc::clone(&queue);
            Box::new(move |transition| {
                if transition == Transition::CameOnline {
                    tracing::info!("back online, requesting sync");
                    queue.request_sync();
                }
            })
        });

        if monitor.is_online() && !queue.is_empty() {
            queue.request_sync();
        }

        Arc::new(SyncCoordinator {
            monitor,
            queue,
            registry,
            edge_listener: Mutex::new(Some(guard)),
        })
    }

    /// The connectivity monitor.
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// The mutation queue.
    pub fn queue(&self) -> &Arc<MutationQueue> {
        &self.queue
    }

    /// The subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Detaches the connectivity wiring and tears down every subscription.
    ///
    /// A sync pass already in progress runs to completion; only future
    /// edge-triggered passes stop.
    pub fn shutdown(&self) {
        self.edge_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.registry.unsubscribe_all();
        tracing::info!("sync coordinator shut down");
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
