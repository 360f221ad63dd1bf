//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, route, targets};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Traffic Router API",
        version = "1.0.0",
        description = "Routes visits to the highest-value eligible target within daily quotas",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Targets
        targets::create_target,
        targets::list_targets,
        targets::get_target,
        targets::update_target,
        // Routing
        route::route_visitor,
    ),
    components(
        schemas(
            // Targets
            crate::models::target::Target,
            crate::models::target::AcceptRules,
            crate::models::target::InclusionSet,
            crate::models::target::CreateTarget,
            crate::models::target::UpdateTarget,
            // Routing
            crate::models::visit::RouteRequest,
            crate::models::visit::RoutingDecision,
            crate::models::visit::AcceptedTarget,
            crate::models::visit::Decision,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "targets", description = "Target management"),
        (name = "route", description = "Visit routing decisions")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
