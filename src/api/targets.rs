//! Target management endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::target::{CreateTarget, Target, UpdateTarget},
};

use super::ApiJson;

/// Register a new target
#[utoipa::path(
    post,
    path = "/api/targets",
    tag = "targets",
    request_body = CreateTarget,
    responses(
        (status = 200, description = "Target created", body = Target),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_target(
    State(state): State<crate::AppState>,
    ApiJson(data): ApiJson<CreateTarget>,
) -> AppResult<Json<Target>> {
    let target = state.services.targets.create(data).await?;
    Ok(Json(target))
}

/// List all targets
#[utoipa::path(
    get,
    path = "/api/targets",
    tag = "targets",
    responses(
        (status = 200, description = "Targets in registration order", body = Vec<Target>)
    )
)]
pub async fn list_targets(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Target>>> {
    let targets = state.services.targets.list().await?;
    Ok(Json(targets))
}

/// Get a target by ID
#[utoipa::path(
    get,
    path = "/api/target/{id}",
    tag = "targets",
    params(("id" = String, Path, description = "Target ID")),
    responses(
        (status = 200, description = "Target details", body = Target),
        (status = 404, description = "Target not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_target(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Target>> {
    let target = state.services.targets.get_by_id(&id).await?;
    Ok(Json(target))
}

/// Update a target; omitted fields keep their stored values
#[utoipa::path(
    post,
    path = "/api/target/{id}",
    tag = "targets",
    params(("id" = String, Path, description = "Target ID")),
    request_body = UpdateTarget,
    responses(
        (status = 200, description = "Target updated", body = Target),
        (status = 400, description = "Invalid fields", body = crate::error::ErrorResponse),
        (status = 404, description = "Target not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_target(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
    ApiJson(data): ApiJson<UpdateTarget>,
) -> AppResult<Json<Target>> {
    let target = state.services.targets.update(&id, data).await?;
    Ok(Json(target))
}
