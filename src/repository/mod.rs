//! Storage layer: target records and daily quota counters

pub mod memory;
pub mod quotas;
pub mod targets;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    error::AppResult,
    models::{NewTarget, Target, TargetUpdate},
    services::redis::RedisService,
};

/// Persistent store of routing targets
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Store a target. Re-using an existing id overwrites the record in place.
    async fn create(&self, target: NewTarget) -> AppResult<Target>;

    /// All targets in insertion order. The order is stable across calls.
    async fn get_all(&self) -> AppResult<Vec<Target>>;

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Target>>;

    /// Apply a partial update, `None` when the target does not exist
    async fn update(&self, id: &str, update: TargetUpdate) -> AppResult<Option<Target>>;
}

/// Shared counters with expiry, used for per-day accept quotas
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically increment `key`, (re)set its time-to-live, and return the new count
    async fn increment_and_expire(&self, key: &str, ttl_seconds: u64) -> AppResult<i64>;

    /// Current count, 0 when the counter is absent or expired
    async fn get_count(&self, key: &str) -> AppResult<i64>;

    /// Undo one increment, returning the new count
    async fn decrement(&self, key: &str) -> AppResult<i64>;
}

/// Main repository struct holding the storage backends
#[derive(Clone)]
pub struct Repository {
    pub targets: Arc<dyn TargetRepository>,
    pub quotas: Arc<dyn QuotaStore>,
}

impl Repository {
    /// Redis-backed storage, shared between router instances
    pub fn redis(redis: RedisService) -> Self {
        Self {
            targets: Arc::new(targets::RedisTargetRepository::new(redis.clone())),
            quotas: Arc::new(quotas::RedisQuotaStore::new(redis)),
        }
    }

    /// Process-local storage
    pub fn memory() -> Self {
        Self {
            targets: Arc::new(memory::MemoryTargetRepository::new()),
            quotas: Arc::new(memory::MemoryQuotaStore::new()),
        }
    }
}
