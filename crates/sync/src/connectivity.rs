// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Connectivity monitor.
//!
//! Wraps a platform [`Reachability`] source and turns raw status reports into
//! transition events. Listeners are only notified on an actual change of the
//! last stable value - repeated reports of the same status are collapsed.
//! The offline-to-online edge is the sole "came back online" trigger in the
//! engine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::Error;
use crate::traits::{Reachability, WatchGuard};

/// A status transition observed by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Offline-to-online edge. Triggers "came back online" behavior.
    CameOnline,
    /// Online-to-offline edge.
    WentOffline,
}

type Listener = Box<dyn Fn(Transition) + Send + Sync>;

/// Deregistration guard for a monitor listener.
///
/// Dropping the guard detaches the listener from future transitions; it does
/// not cancel work a past transition already started.
pub struct ListenerGuard {
    monitor: Weak<ConnectivityMonitor>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            let mut listeners = monitor
                .listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Observes network reachability and emits transition events.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    /// Keeps the platform watcher registered for the monitor's lifetime.
    watch: Mutex<Option<WatchGuard>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor over the given reachability source.
    ///
    /// The initial status comes from one probe; if the probe itself errors
    /// the monitor assumes online (fail-open) so the app is never blocked on
    /// a broken status API.
    pub fn new(reachability: Arc<dyn Reachability>) -> Arc<Self> {
        let online = match reachability.is_connected() {
            Ok(online) => online,
            Err(e) => {
                let error = Error::Connectivity(e);
                tracing::warn!(error = %error, "reachability check failed, assuming online");
                true
            }
        };

        let monitor = Arc::new(ConnectivityMonitor {
            online: AtomicBool::new(online),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            watch: Mutex::new(None),
        });

        let weak = Arc::downgrade(&monitor);
        let guard = reachability.watch(Box::new(move |raw| {
            if let Some(monitor) = weak.upgrade() {
                monitor.report(raw);
            }
        }));
        *monitor.watch.lock().unwrap_or_else(|e| e.into_inner()) = Some(guard);

        monitor
    }

    /// Current best-known status.
    pub fn is_online(&self) -> bool {
        self.online.load(AtomicOrdering::SeqCst)
    }

    /// Feeds a raw status observation into the monitor.
    ///
    /// Called by the platform watcher; also the test entry point. Reports
    /// matching the last stable value are collapsed and notify nobody.
    pub fn report(&self, online: bool) {
        let was_online = self.online.swap(online, AtomicOrdering::SeqCst);
        if was_online == online {
            return;
        }

        let transition = if online {
            Transition::CameOnline
        } else {
            Transition::WentOffline
        };
        tracing::debug!(?transition, "connectivity transition");

        // Listeners run under the lock; they must not register or remove
        // listeners reentrantly. In practice they hand off to a spawned task.
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for (_, listener) in listeners.iter() {
            listener(transition);
        }
    }

    /// Registers a listener invoked on every status transition.
    pub fn on_change(
        self: &Arc<Self>,
        listener: Box<dyn Fn(Transition) + Send + Sync>,
    ) -> ListenerGuard {
        let id = self.next_listener_id.fetch_add(1, AtomicOrdering::SeqCst);
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push((id, listener));
        ListenerGuard {
            monitor: Arc::downgrade(self),
            id,
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
