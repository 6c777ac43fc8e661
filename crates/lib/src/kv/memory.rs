//! Process-local key-value store with lazy TTL expiry.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KvError, KvStore};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at_millis: u64,
}

/// In-memory [`KvStore`].
///
/// Expired keys are invisible to readers immediately and are physically
/// removed on the next write or [`purge_expired`](Self::purge_expired).
/// Sessions are lost on restart.
#[derive(Debug, Clone)]
pub struct InMemoryKv {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    clock: Arc<dyn Clock>,
    available: Arc<AtomicBool>,
}

impl InMemoryKv {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            clock,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let slots = self.slots.read().await;
        slots.values().filter(|s| s.expires_at_millis > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired keys; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, s| s.expires_at_millis > now);
        before - slots.len()
    }

    /// Make every call fail with [`KvError::Unavailable`] while `false`.
    ///
    /// Lets tests exercise the outage path without a real backend.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), KvError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KvError::Unavailable {
                reason: "in-memory store marked unavailable".to_string(),
                source: None,
            })
        }
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.check_available()?;
        let now = self.clock.now_millis();
        let expires_at_millis = self.clock.deadline_millis(ttl);
        let mut slots = self.slots.write().await;
        slots.retain(|_, s| s.expires_at_millis > now);
        slots.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at_millis,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_available()?;
        let now = self.clock.now_millis();
        let slots = self.slots.read().await;
        Ok(slots
            .get(key)
            .filter(|s| s.expires_at_millis > now)
            .map(|s| s.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        self.check_available()?;
        let now = self.clock.now_millis();
        let mut slots = self.slots.write().await;
        Ok(slots
            .remove(key)
            .is_some_and(|s| s.expires_at_millis > now))
    }

    async fn ping(&self) -> Result<(), KvError> {
        self.check_available()
    }
}
