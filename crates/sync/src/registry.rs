// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Subscription registry.
//!
//! Single source of truth mapping a logical subscription key to exactly one
//! live channel. Re-subscribing under an existing key tears the old channel
//! down and opens the new one inside the same critical section, so there is
//! no window where both channels could deliver events for the same key.
//!
//! Channel handles never leave the registry; callers only ever hold the
//! [`Unsubscribe`] token returned by `subscribe`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use eddy_core::EventFilter;

use crate::error::Error;
use crate::traits::{ChannelFactory, EventCallback, LiveChannel};

struct Entry {
    /// Identifies which `subscribe` call created this entry, so a stale
    /// unsubscribe token never tears down a successor.
    serial: u64,
    channel: Box<dyn LiveChannel>,
}

/// Token that removes exactly the handle its `subscribe` call created.
///
/// Safe to invoke after the key was replaced by a later `subscribe`; it then
/// does nothing. Dropping the token without invoking it leaves the
/// subscription active.
pub struct Unsubscribe {
    inner: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    fn new(remove: Box<dyn FnOnce() + Send>) -> Self {
        Unsubscribe {
            inner: Some(remove),
        }
    }

    /// A token with nothing to remove (returned when channel open failed).
    pub fn noop() -> Self {
        Unsubscribe { inner: None }
    }

    /// Tears down the handle this token belongs to, if still active.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.inner.take() {
            remove();
        }
    }
}

/// Tracks one active live-update channel per logical key.
pub struct SubscriptionRegistry {
    factory: Arc<dyn ChannelFactory>,
    entries: Mutex<HashMap<String, Entry>>,
    next_serial: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates a registry opening channels through the given factory.
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Arc<Self> {
        Arc::new(SubscriptionRegistry {
            factory,
            entries: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        })
    }

    /// Subscribes `key` to a channel, replacing any previous subscription
    /// under the same key.
    ///
    /// The previous handle (if any) is closed before the new channel opens,
    /// within one critical section. A factory failure is logged and yields a
    /// no-op token - it never propagates to the caller.
    pub fn subscribe(
        self: &Arc<Self>,
        key: &str,
        channel_name: &str,
        filter: EventFilter,
        callback: EventCallback,
    ) -> Unsubscribe {
        let serial = self.next_serial.fetch_add(1, AtomicOrdering::SeqCst);
        let mut entries = self.lock_entries();

        if let Some(mut old) = entries.remove(key) {
            tracing::debug!(key, "replacing existing subscription");
            old.channel.close();
        }

        match self.factory.open(channel_name, &filter, callback) {
            Ok(channel) => {
                entries.insert(key.to_string(), Entry { serial, channel });
                drop(entries);

                let registry = Arc::clone(self);
                let key = key.to_string();
                Unsubscribe::new(Box::new(move || registry.remove_serial(&key, serial)))
            }
            Err(e) => {
                let error = Error::Subscription {
                    key: key.to_string(),
                    source: e,
                };
                tracing::warn!(channel = channel_name, error = %error, "channel open failed");
                Unsubscribe::noop()
            }
        }
    }

    /// Tears down and removes the handle for `key`, if present.
    pub fn unsubscribe(&self, key: &str) {
        let mut entries = self.lock_entries();
        if let Some(mut entry) = entries.remove(key) {
            entry.channel.close();
        }
    }

    /// Tears down every tracked handle. Used on app background / sign-out.
    pub fn unsubscribe_all(&self) {
        let mut entries = self.lock_entries();
        let count = entries.len();
        for (_, mut entry) in entries.drain() {
            entry.channel.close();
        }
        if count > 0 {
            tracing::debug!(count, "tore down all subscriptions");
        }
    }

    /// The currently subscribed keys, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let entries = self.lock_entries();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether no subscriptions are active.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Removes `key` only if its entry still belongs to `serial`.
    fn remove_serial(&self, key: &str, serial: u64) {
        let mut entries = self.lock_entries();
        let matches = entries.get(key).is_some_and(|entry| entry.serial == serial);
        if matches {
            if let Some(mut entry) = entries.remove(key) {
                entry.channel.close();
            }
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
