//! Target management service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        target::{CreateTarget, UpdateTarget},
        Target,
    },
    repository::TargetRepository,
};

#[derive(Clone)]
pub struct TargetsService {
    repository: Arc<dyn TargetRepository>,
}

impl TargetsService {
    pub fn new(repository: Arc<dyn TargetRepository>) -> Self {
        Self { repository }
    }

    /// Validate and store a new target
    pub async fn create(&self, request: CreateTarget) -> AppResult<Target> {
        let new_target = request.into_new_target()?;
        let target = self.repository.create(new_target).await?;
        tracing::info!("Created target {} -> {}", target.id, target.url);
        Ok(target)
    }

    /// List all targets in registration order
    pub async fn list(&self) -> AppResult<Vec<Target>> {
        self.repository.get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Target> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Target not found".to_string()))
    }

    /// Apply a partial update
    pub async fn update(&self, id: &str, request: UpdateTarget) -> AppResult<Target> {
        let update = request.into_update()?;
        let target = self
            .repository
            .update(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Target not found".to_string()))?;
        tracing::info!("Updated target {}", target.id);
        Ok(target)
    }
}
