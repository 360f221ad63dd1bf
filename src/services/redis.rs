//! Redis connection shared by the target and quota stores

use redis::{aio::ConnectionManager, Client};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    manager: ConnectionManager,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Invalid Redis URL: {}", e)))?;

        // Reconnects transparently after a dropped connection
        let manager = ConnectionManager::new(client).await?;

        let service = Self { manager };
        service.ping().await?;
        Ok(service)
    }

    /// Round-trip a PING, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }

    /// Get a connection handle. Handles share one multiplexed connection.
    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}
