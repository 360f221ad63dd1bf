//! Business logic services

pub mod quota;
pub mod redis;
pub mod routing;
pub mod targets;

use crate::{config::QuotaConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub targets: targets::TargetsService,
    pub routing: routing::RoutingService,
    /// Present when storage is Redis-backed
    pub redis: Option<redis::RedisService>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        quota_config: &QuotaConfig,
        redis_service: Option<redis::RedisService>,
    ) -> Self {
        let quota = quota::QuotaService::new(repository.quotas.clone(), quota_config.ttl_seconds);
        Self {
            targets: targets::TargetsService::new(repository.targets.clone()),
            routing: routing::RoutingService::new(
                repository.targets,
                quota,
                quota_config.enforcement,
            ),
            redis: redis_service,
        }
    }

    /// Check that backing storage answers
    pub async fn check_ready(&self) -> AppResult<()> {
        match &self.redis {
            Some(redis) => redis.ping().await,
            None => Ok(()),
        }
    }
}
