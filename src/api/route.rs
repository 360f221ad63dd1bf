//! Visit routing endpoint

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{visit::RouteRequest, RoutingDecision},
};

use super::ApiJson;

/// Route a visit to the best eligible target
#[utoipa::path(
    post,
    path = "/route",
    tag = "route",
    request_body = RouteRequest,
    responses(
        (status = 200, description = "Routing decision", body = RoutingDecision),
        (status = 400, description = "Missing fields or invalid timestamp", body = crate::error::ErrorResponse),
        (status = 503, description = "Storage unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn route_visitor(
    State(state): State<crate::AppState>,
    ApiJson(request): ApiJson<RouteRequest>,
) -> AppResult<Json<RoutingDecision>> {
    let visit = request.into_visit()?;
    let decision = state.services.routing.route(&visit).await?;
    Ok(Json(decision))
}
