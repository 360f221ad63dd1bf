//! In-process storage backends
//!
//! Useful for a single router instance and for tests. Counters are not shared
//! between processes, so quotas only hold per instance.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::{Mutex, RwLock};

use super::{QuotaStore, TargetRepository};
use crate::{
    error::AppResult,
    models::{NewTarget, Target, TargetUpdate},
};

/// Targets kept in insertion order
#[derive(Default)]
pub struct MemoryTargetRepository {
    targets: RwLock<IndexMap<String, Target>>,
}

impl MemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetRepository for MemoryTargetRepository {
    async fn create(&self, new: NewTarget) -> AppResult<Target> {
        let target = Target::from_new(new);
        self.targets
            .write()
            .await
            .insert(target.id.clone(), target.clone());
        Ok(target)
    }

    async fn get_all(&self) -> AppResult<Vec<Target>> {
        Ok(self.targets.read().await.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Target>> {
        Ok(self.targets.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, update: TargetUpdate) -> AppResult<Option<Target>> {
        let mut targets = self.targets.write().await;
        Ok(targets.get_mut(id).map(|target| {
            target.apply(update);
            target.clone()
        }))
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Instant,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Counters with lazy expiry
#[derive(Default)]
pub struct MemoryQuotaStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired counters
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, c| c.is_live(now));
        before - counters.len()
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn increment_and_expire(&self, key: &str, ttl_seconds: u64) -> AppResult<i64> {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(ttl_seconds);
        let mut counters = self.counters.lock().await;

        let counter = counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at,
        });
        if !counter.is_live(now) {
            counter.count = 0;
        }
        counter.count += 1;
        counter.expires_at = expires_at;
        Ok(counter.count)
    }

    async fn get_count(&self, key: &str) -> AppResult<i64> {
        let now = Instant::now();
        Ok(self
            .counters
            .lock()
            .await
            .get(key)
            .filter(|c| c.is_live(now))
            .map_or(0, |c| c.count))
    }

    async fn decrement(&self, key: &str) -> AppResult<i64> {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        match counters.get_mut(key) {
            Some(counter) if counter.is_live(now) => {
                counter.count -= 1;
                Ok(counter.count)
            }
            _ => {
                counters.remove(key);
                Ok(0)
            }
        }
    }
}
