//! API tests against an in-process router with in-memory storage

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use traffic_router::{
    api::create_router,
    config::{AppConfig, QuotaEnforcement},
    repository::Repository,
    services::Services,
    AppState,
};

fn app_with(enforcement: QuotaEnforcement) -> Router {
    let mut config = AppConfig::default();
    config.quota.enforcement = enforcement;
    let services = Services::new(Repository::memory(), &config.quota, None);
    create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn app() -> Router {
    app_with(QuotaEnforcement::Soft)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn create_target(app: &Router, body: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/api/targets", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    body
}

async fn route(app: &Router, geo_state: &str, timestamp: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/route",
        Some(json!({"geoState": geo_state, "timestamp": timestamp})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "route failed: {}", body);
    body
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = send(&app(), Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_target_with_all_fields() {
    let app = app();
    let request = json!({
        "url": "https://example.com",
        "value": "0.50",
        "maxAcceptsPerDay": "10",
        "accept": {
            "geoState": {"$in": ["ca", "ny"]},
            "hour": {"$in": ["13", "14", "15"]}
        }
    });
    let body = create_target(&app, request.clone()).await;

    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["value"], "0.50");
    assert_eq!(body["maxAcceptsPerDay"], 10);
    assert_eq!(body["accept"], request["accept"]);
}

#[tokio::test]
async fn test_create_target_minimal_fields_defaults_accept() {
    let body = create_target(
        &app(),
        json!({"url": "https://minimal.com", "value": "1.00", "maxAcceptsPerDay": "5"}),
    )
    .await;
    assert_eq!(body["accept"], json!({}));
}

#[tokio::test]
async fn test_create_target_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/targets",
        Some(json!({"value": "1.00", "maxAcceptsPerDay": "5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Missing required fields"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/targets",
        Some(json!({"url": "https://e.com", "value": "invalid", "maxAcceptsPerDay": "5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("non-negative number"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/targets",
        Some(json!({"url": "https://e.com", "value": "1", "maxAcceptsPerDay": "-5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("non-negative integer"));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/targets")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_get_and_update_targets() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/targets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let first = create_target(
        &app,
        json!({"url": "https://one.com", "value": "1", "maxAcceptsPerDay": 1}),
    )
    .await;
    create_target(
        &app,
        json!({"url": "https://two.com", "value": "2", "maxAcceptsPerDay": 2}),
    )
    .await;

    let (_, body) = send(&app, Method::GET, "/api/targets", None).await;
    let urls: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, ["https://one.com", "https://two.com"]);

    let id = first["id"].as_str().unwrap();
    let (status, body) = send(&app, Method::GET, &format!("/api/target/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, first);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/target/{}", id),
        Some(json!({"value": "3.50"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["value"], "3.50");
    assert_eq!(body["url"], "https://one.com");
    assert_eq!(body["maxAcceptsPerDay"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/target/{}", id),
        Some(json!({"maxAcceptsPerDay": "-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("non-negative integer"));
}

#[tokio::test]
async fn test_missing_target() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/target/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/target/nonexistent",
        Some(json!({"value": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/target/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchRoute");

    let (_, body) = send(&app, Method::GET, "/api/target/nonexistent", None).await;
    assert_eq!(body["error"], "NoSuchTarget");
}

#[tokio::test]
async fn test_create_target_rejects_id_with_key_separator() {
    let app = app();
    let victim = create_target(
        &app,
        json!({"id": "victim", "url": "https://victim.com", "value": "1", "maxAcceptsPerDay": 5}),
    )
    .await;
    assert_eq!(victim["id"], "victim");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/targets",
        Some(json!({
            "id": "victim:accepts:2018-07-19",
            "url": "https://other.com",
            "value": "1",
            "maxAcceptsPerDay": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("\"id\""));

    let (_, body) = send(&app, Method::GET, "/api/targets", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_target_accepts_integral_float_quota() {
    let body = create_target(
        &app(),
        json!({"url": "https://float.com", "value": "1", "maxAcceptsPerDay": 2.0}),
    )
    .await;
    assert_eq!(body["maxAcceptsPerDay"], 2);
}

#[tokio::test]
async fn test_method_not_allowed() {
    let app = app();
    for (method, uri) in [
        (Method::PUT, "/api/targets"),
        (Method::DELETE, "/api/target/123"),
        (Method::GET, "/route"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
        assert_eq!(body["message"], "Method Not Allowed");
    }
}

#[tokio::test]
async fn test_route_respects_daily_limit() {
    let app = app();
    create_target(
        &app,
        json!({
            "url": "https://example.com",
            "value": "1.00",
            "maxAcceptsPerDay": 2,
            "accept": {"geoState": {"$in": ["ca"]}, "hour": {"$in": [14]}}
        }),
    )
    .await;

    let decisions: Vec<Value> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(route(&app, "ca", "2018-07-19T14:28:59Z").await);
        }
        out
    };
    assert_eq!(decisions[0]["decision"], "accept");
    assert_eq!(decisions[1]["decision"], "accept");
    assert_eq!(decisions[2], json!({"decision": "reject"}));

    // A new UTC day has fresh quota
    let next_day = route(&app, "CA", "2018-07-20T14:01:00Z").await;
    assert_eq!(next_day["decision"], "accept");
}

#[tokio::test]
async fn test_route_selects_highest_value() {
    let app = app();
    for (url, value) in [("https://low.com", "0.25"), ("https://high.com", "2.50"), ("https://mid.com", "1.00")] {
        create_target(&app, json!({"url": url, "value": value, "maxAcceptsPerDay": 10})).await;
    }

    let body = route(&app, "ny", "2018-07-19T09:00:00Z").await;
    assert_eq!(body["decision"], "accept");
    assert_eq!(body["target"]["url"], "https://high.com");
    assert_eq!(body["target"]["value"], "2.50");
    assert!(body["target"]["id"].is_string());
}

#[tokio::test]
async fn test_route_with_no_targets() {
    let body = route(&app(), "ca", "2018-07-19T14:28:59Z").await;
    assert_eq!(body, json!({"decision": "reject"}));
}

#[tokio::test]
async fn test_route_request_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/route",
        Some(json!({"timestamp": "2018-07-19T14:28:59Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("geoState"));

    let (status, _) = send(&app, Method::POST, "/route", Some(json!({"geoState": "ca"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/route",
        Some(json!({"geoState": "ca", "timestamp": "invalid-timestamp"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid timestamp"));
}

#[tokio::test]
async fn test_strict_route_never_exceeds_quota() {
    let app = app_with(QuotaEnforcement::Strict);
    create_target(&app, json!({"url": "https://one.com", "value": "1", "maxAcceptsPerDay": 1})).await;

    assert_eq!(route(&app, "ca", "2018-07-19T14:28:59Z").await["decision"], "accept");
    assert_eq!(route(&app, "ca", "2018-07-19T15:28:59Z").await["decision"], "reject");
}

#[tokio::test]
async fn test_request_id_header() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
