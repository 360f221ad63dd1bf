//! Redis target repository
//!
//! Records live under `target:{id}` as JSON. The `targets` sorted set indexes
//! ids scored by an insertion sequence so enumeration order is stable.

use async_trait::async_trait;
use redis::AsyncCommands;

use super::TargetRepository;
use crate::{
    error::AppResult,
    models::{NewTarget, Target, TargetUpdate},
    services::redis::RedisService,
};

const TARGET_INDEX_KEY: &str = "targets";
const TARGET_SEQUENCE_KEY: &str = "targets:seq";

fn target_key(id: &str) -> String {
    format!("target:{}", id)
}

#[derive(Clone)]
pub struct RedisTargetRepository {
    redis: RedisService,
}

impl RedisTargetRepository {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }

    async fn store(&self, target: &Target) -> AppResult<()> {
        let mut conn = self.redis.connection();
        let payload = serde_json::to_string(target)?;
        conn.set::<_, _, ()>(target_key(&target.id), payload).await?;
        Ok(())
    }
}

#[async_trait]
impl TargetRepository for RedisTargetRepository {
    async fn create(&self, new: NewTarget) -> AppResult<Target> {
        let target = Target::from_new(new);
        let payload = serde_json::to_string(&target)?;
        let mut conn = self.redis.connection();

        let seq: i64 = conn.incr(TARGET_SEQUENCE_KEY, 1).await?;

        // NX keeps the first position when an id is re-used
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(target_key(&target.id))
            .arg(payload)
            .ignore()
            .cmd("ZADD")
            .arg(TARGET_INDEX_KEY)
            .arg("NX")
            .arg(seq)
            .arg(&target.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!("Stored target {}", target.id);
        Ok(target)
    }

    async fn get_all(&self) -> AppResult<Vec<Target>> {
        let mut conn = self.redis.connection();

        let ids: Vec<String> = conn.zrange(TARGET_INDEX_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| target_key(id)).collect();
        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut targets = Vec::with_capacity(payloads.len());
        for payload in payloads.into_iter().flatten() {
            targets.push(serde_json::from_str(&payload)?);
        }
        Ok(targets)
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Target>> {
        let mut conn = self.redis.connection();
        let payload: Option<String> = conn.get(target_key(id)).await?;
        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(Into::into)
    }

    async fn update(&self, id: &str, update: TargetUpdate) -> AppResult<Option<Target>> {
        let Some(mut target) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        target.apply(update);
        self.store(&target).await?;
        Ok(Some(target))
    }
}
