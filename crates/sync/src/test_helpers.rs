// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Shared test helpers for the sync engine tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use eddy_core::{
    ChangeEvent, ClockSource, EventFilter, MessageRecord, OpPayload, PartyRecord, ProfileRecord,
};

use crate::traits::{
    ChannelFactory, ConnectivityError, EventCallback, KeyValueStore, LiveChannel, Reachability,
    RemoteError, RemoteResult, RemoteStore, StorageError, SubscribeError, WatchGuard,
};

/// Mock clock with controllable time.
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    pub fn new(initial_ms: u64) -> Self {
        MockClock {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, AtomicOrdering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(AtomicOrdering::SeqCst)
    }
}

/// A remote verb invocation recorded by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub verb: &'static str,
    pub collection: String,
    pub id: String,
}

/// In-memory backend stub.
///
/// Applies verbs idempotently (upsert-by-id, delete tolerant of absence) and
/// records every call. Failures can be injected per record id or globally,
/// and an optional semaphore gate lets tests hold a pass mid-flight.
#[derive(Default)]
pub struct MockRemote {
    rows: Mutex<HashMap<(String, String), serde_json::Value>>,
    calls: Mutex<Vec<RemoteCall>>,
    fail_counts: Mutex<HashMap<String, u32>>,
    fail_all: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote::default())
    }

    /// Makes the next `n` attempts touching `record_id` fail.
    pub fn fail_first(&self, record_id: &str, n: u32) {
        self.fail_counts
            .lock()
            .unwrap()
            .insert(record_id.to_string(), n);
    }

    /// Makes every attempt fail until cleared.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, AtomicOrdering::SeqCst);
    }

    /// Installs a semaphore gate acquired once per verb call.
    pub fn set_gate(&self, gate: Arc<Semaphore>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of verb calls that have started (possibly still gated).
    pub fn started_count(&self) -> usize {
        self.started.load(AtomicOrdering::SeqCst)
    }

    /// Highest number of verb calls ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(AtomicOrdering::SeqCst)
    }

    pub fn row(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        self.rows
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn row_count(&self, collection: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    async fn begin(&self, verb: &'static str, collection: String, id: String) -> RemoteResult<()> {
        self.started.fetch_add(1, AtomicOrdering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.max_in_flight
            .fetch_max(in_flight, AtomicOrdering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
        self.calls.lock().unwrap().push(RemoteCall {
            verb,
            collection,
            id: id.clone(),
        });

        if self.fail_all.load(AtomicOrdering::SeqCst) {
            return Err(RemoteError::Unavailable("mock offline".into()));
        }
        let mut fail_counts = self.fail_counts.lock().unwrap();
        if let Some(remaining) = fail_counts.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::Unavailable("mock transient failure".into()));
            }
        }
        Ok(())
    }
}

impl RemoteStore for MockRemote {
    fn insert(
        &self,
        collection: &str,
        row: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        let collection = collection.to_string();
        Box::pin(async move {
            let id = row["id"].as_str().unwrap_or_default().to_string();
            self.begin("insert", collection.clone(), id.clone()).await?;
            // Upsert-by-id: a second insert replaces, never duplicates.
            self.rows.lock().unwrap().insert((collection, id), row);
            Ok(())
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        row: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move {
            self.begin("update", collection.clone(), id.clone()).await?;
            self.rows.lock().unwrap().insert((collection, id), row);
            Ok(())
        })
    }

    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move {
            self.begin("delete", collection.clone(), id.clone()).await?;
            // Tolerant of "already gone".
            self.rows.lock().unwrap().remove(&(collection, id));
            Ok(())
        })
    }
}

/// KV store whose writes always fail. Reads see nothing.
pub struct FailingKv;

impl KeyValueStore for FailingKv {
    fn get(
        &self,
        _key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>> {
        Box::pin(async { Ok(None) })
    }

    fn set(
        &self,
        _key: &str,
        _value: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        Box::pin(async { Err(StorageError("disk full".into())) })
    }
}

/// Reachability stub with a settable status and optional probe failure.
pub struct MockReachability {
    online: AtomicBool,
    probe_fails: AtomicBool,
    watchers: Mutex<Vec<Box<dyn Fn(bool) + Send + Sync>>>,
}

impl MockReachability {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(MockReachability {
            online: AtomicBool::new(online),
            probe_fails: AtomicBool::new(false),
            watchers: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_probe() -> Arc<Self> {
        let reachability = MockReachability::new(false);
        reachability.probe_fails.store(true, AtomicOrdering::SeqCst);
        reachability
    }

    /// Simulates a platform status callback.
    pub fn emit(&self, online: bool) {
        self.online.store(online, AtomicOrdering::SeqCst);
        let watchers = self.watchers.lock().unwrap();
        for watcher in watchers.iter() {
            watcher(online);
        }
    }
}

impl Reachability for MockReachability {
    fn is_connected(&self) -> Result<bool, ConnectivityError> {
        if self.probe_fails.load(AtomicOrdering::SeqCst) {
            return Err(ConnectivityError("mock probe failure".into()));
        }
        Ok(self.online.load(AtomicOrdering::SeqCst))
    }

    fn watch(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> WatchGuard {
        self.watchers.lock().unwrap().push(callback);
        WatchGuard::noop()
    }
}

/// State of one channel opened by [`MockChannelFactory`].
pub struct ChannelState {
    pub name: String,
    pub closed: AtomicBool,
    pub callback: EventCallback,
}

struct MockChannel {
    state: Arc<ChannelState>,
    log: Arc<Mutex<Vec<String>>>,
}

impl LiveChannel for MockChannel {
    fn close(&mut self) {
        self.state.closed.store(true, AtomicOrdering::SeqCst);
        self.log.lock().unwrap().push(format!("close:{}", self.state.name));
    }
}

/// Channel factory stub recording open/close order and delivering events.
#[derive(Default)]
pub struct MockChannelFactory {
    channels: Mutex<Vec<Arc<ChannelState>>>,
    log: Arc<Mutex<Vec<String>>>,
    fail_next: AtomicBool,
}

impl MockChannelFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(MockChannelFactory::default())
    }

    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, AtomicOrdering::SeqCst);
    }

    /// Every open/close in order, e.g. `["open:a", "close:a", "open:b"]`.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Channels opened over the factory's lifetime.
    pub fn opened_count(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    /// Channels currently live (opened and not closed).
    pub fn active_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.closed.load(AtomicOrdering::SeqCst))
            .count()
    }

    /// Pushes an event through every live channel's callback.
    pub fn deliver(&self, event: &ChangeEvent) {
        let channels = self.channels.lock().unwrap();
        for channel in channels.iter() {
            if !channel.closed.load(AtomicOrdering::SeqCst) {
                (channel.callback)(event.clone());
            }
        }
    }
}

impl ChannelFactory for MockChannelFactory {
    fn open(
        &self,
        channel_name: &str,
        _filter: &EventFilter,
        callback: EventCallback,
    ) -> Result<Box<dyn LiveChannel>, SubscribeError> {
        if self.fail_next.swap(false, AtomicOrdering::SeqCst) {
            return Err(SubscribeError("mock open failure".into()));
        }

        let state = Arc::new(ChannelState {
            name: channel_name.to_string(),
            closed: AtomicBool::new(false),
            callback,
        });
        self.channels.lock().unwrap().push(Arc::clone(&state));
        self.log
            .lock()
            .unwrap()
            .push(format!("open:{channel_name}"));

        Ok(Box::new(MockChannel {
            state,
            log: Arc::clone(&self.log),
        }))
    }
}

/// Polls `cond` until it holds or `timeout_ms` elapses.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn message_payload(id: &str) -> OpPayload {
    OpPayload::Messages(MessageRecord {
        id: id.to_string(),
        party_id: "p1".to_string(),
        author_id: "alice".to_string(),
        body: format!("message {id}"),
        sent_at: chrono::Utc::now(),
    })
}

pub fn party_payload(id: &str) -> OpPayload {
    OpPayload::Parties(PartyRecord {
        id: id.to_string(),
        name: format!("party {id}"),
        host_id: "alice".to_string(),
        starts_at: None,
        capacity: Some(12),
    })
}

pub fn profile_payload(id: &str) -> OpPayload {
    OpPayload::Profiles(ProfileRecord {
        id: id.to_string(),
        display_name: "Alice".to_string(),
        bio: None,
        avatar_url: None,
    })
}
