//! # Session Store
//!
//! TTL-keyed cache of `SessionRecord` with compute-once semantics.
//!
//! `get_or_create` is a memoization contract, not a write-through cache: once a
//! key holds a live record, later calls return it without running the factory,
//! even when the caller's amount or email differ. Callers mint a new reference
//! for every logically distinct session.
//!
//! The in-memory store holds a per-key lock across the factory call and the
//! cache write, so concurrent calls for the same uncached key run the remote
//! initialize at most once.
//!
//! The deferred callback of a stored session is handed out by `take_callback`
//! exactly once; later takes see `None` until `restore_callback` puts it back.

use crate::error::GatewayResult;
use crate::notification::CallbackHandle;
use crate::record::SessionRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Deferred session construction, only polled on a cache miss
pub type SessionFactory<'a> =
    Pin<Box<dyn Future<Output = GatewayResult<SessionRecord>> + Send + 'a>>;

/// Storage for initialized sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Live record under `key`, if any
    async fn get(&self, key: &str) -> Option<SessionRecord>;

    /// Return the live record under `key`, or run `factory` and cache its result for `ttl`.
    ///
    /// A failing factory caches nothing.
    async fn get_or_create(
        &self,
        key: &str,
        ttl: Duration,
        factory: SessionFactory<'_>,
    ) -> GatewayResult<SessionRecord>;

    /// Remove and return the deferred callback of the live record under `key`
    async fn take_callback(&self, key: &str) -> Option<CallbackHandle>;

    /// Put back a callback taken from `key`, if the record is still live and empty
    async fn restore_callback(&self, key: &str, callback: CallbackHandle);

    /// Drop the record under `key`
    async fn forget(&self, key: &str);

    /// Drop every expired record, returning how many were removed
    async fn purge_expired(&self) -> usize;
}

/// Type alias for a shared session store (dynamic dispatch)
pub type SharedSessionStore = Arc<dyn SessionStore>;

#[derive(Debug, Clone)]
struct Entry {
    record: SessionRecord,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Slot = Arc<Mutex<Option<Entry>>>;

/// Process-local session store
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    slots: Arc<DashMap<String, Slot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, live or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, key: &str) -> Slot {
        // Holds the shard lock only long enough to clone the Arc.
        let entry = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)));
        Arc::clone(entry.value())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Option<SessionRecord> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.record.clone())
    }

    async fn get_or_create(
        &self,
        key: &str,
        ttl: Duration,
        factory: SessionFactory<'_>,
    ) -> GatewayResult<SessionRecord> {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref().filter(|e| e.is_live(Instant::now())) {
            trace!(%key, "session cache hit");
            return Ok(entry.record.clone());
        }

        trace!(%key, "session cache miss");
        let record = factory.await?;
        *guard = Some(Entry {
            record: record.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(record)
    }

    async fn take_callback(&self, key: &str) -> Option<CallbackHandle> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let mut guard = slot.lock().await;
        let entry = guard.as_mut().filter(|e| e.is_live(Instant::now()))?;
        let callback = entry.record.deferred_callback.take();
        if callback.is_some() {
            trace!(%key, "deferred callback taken");
        }
        callback
    }

    async fn restore_callback(&self, key: &str, callback: CallbackHandle) {
        let Some(slot) = self.slots.get(key).map(|s| Arc::clone(s.value())) else {
            return;
        };
        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_mut().filter(|e| e.is_live(Instant::now())) {
            entry.record.deferred_callback.get_or_insert(callback);
        }
    }

    async fn forget(&self, key: &str) {
        self.slots.remove(key);
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        // Slots locked by an in-flight factory are kept.
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => guard.as_ref().is_some_and(|e| e.is_live(now)),
            Err(_) => true,
        });
        before.saturating_sub(self.slots.len())
    }
}
