//! API handlers for the traffic router REST endpoints

pub mod health;
pub mod openapi;
pub mod route;
pub mod targets;

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// JSON body extractor whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check).fallback(method_not_allowed))
        .route("/ready", get(health::readiness_check).fallback(method_not_allowed))
        // Targets
        .route(
            "/api/targets",
            get(targets::list_targets)
                .post(targets::create_target)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/target/:id",
            get(targets::get_target)
                .post(targets::update_target)
                .fallback(method_not_allowed),
        )
        // Routing decisions
        .route("/route", post(route::route_visitor).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state);

    api.merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found() -> AppError {
    AppError::RouteNotFound
}
