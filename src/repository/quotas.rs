//! Redis quota counters

use async_trait::async_trait;
use redis::AsyncCommands;

use super::QuotaStore;
use crate::{error::AppResult, services::redis::RedisService};

#[derive(Clone)]
pub struct RedisQuotaStore {
    redis: RedisService,
}

impl RedisQuotaStore {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn increment_and_expire(&self, key: &str, ttl_seconds: u64) -> AppResult<i64> {
        let mut conn = self.redis.connection();

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn get_count(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.redis.connection();
        let count: Option<i64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }

    async fn decrement(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.redis.connection();
        let count: i64 = conn.decr(key, 1).await?;
        Ok(count)
    }
}
