//! HTTP surface tests driven through the router without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use provider_aggregator::http::{build_router, AppState, REQUEST_ID_HEADER};
use provider_aggregator::lifecycle::{Aggregator, PollerSettings, Shutdown};
use provider_aggregator::local::{parse_local, LocalConfigStore};
use provider_aggregator::registry::MemoryRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{document, MockProvider};

const LOCAL: &str = r#"
[[routers]]
name = "dashboard"
hostnames = ["dashboard.example.com"]
service = "dashboard-svc"

[[services]]
name = "dashboard-svc"
servers = ["http://10.0.0.5:3000"]
"#;

fn app() -> (Router, Aggregator) {
    let registry = Arc::new(MemoryRegistry::new());
    let settings = PollerSettings {
        min_interval: Duration::from_secs(5),
        fetch_timeout: Duration::from_secs(2),
    };
    let aggregator = Aggregator::new(registry, settings, Shutdown::new()).unwrap();
    let local = LocalConfigStore::new(parse_local(LOCAL).unwrap());
    let router = build_router(AppState::new(aggregator.clone(), local), Duration::from_secs(10));
    (router, aggregator)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_sets_request_id() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_provider_config_serves_local_and_remote() {
    let provider = MockProvider::start(200, &document(&["remote-app"], &["remote-svc"])).await;
    let (app, _) = app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "edge", "url": provider.url(), "priority": 5, "is_active": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["refresh_interval"], 30);
    assert_eq!(created["name"], "edge");

    let (status, config) = send(&app, Method::GET, "/api/provider/config", None).await;
    assert_eq!(status, StatusCode::OK);
    let routers = config["http"]["routers"].as_object().unwrap();
    assert!(routers.contains_key("dashboard"));
    assert!(routers.contains_key("remote-app"));
    assert!(config["http"]["middlewares"]
        .as_object()
        .unwrap()
        .contains_key("dashboard-redirect-https"));
    assert!(config.get("conflicts").is_none());
}

#[tokio::test]
async fn test_merged_config_reports_conflicts_and_sources() {
    let provider = MockProvider::start(200, &document(&["dashboard"], &[])).await;
    let (app, _) = app();

    send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "edge", "url": provider.url(), "priority": 5, "is_active": true})),
    )
    .await;

    let (status, view) = send(&app, Method::GET, "/api/http-providers/merged-config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        view["conflicts"],
        json!([{
            "type": "router",
            "name": "dashboard",
            "source": "edge",
            "overridden_by": "local",
            "source_priority": 5,
        }])
    );
    assert_eq!(view["sources"][0]["name"], "local");
    assert_eq!(view["sources"][0]["router_count"], 1);
    assert_eq!(view["sources"][1]["name"], "edge");
    assert_eq!(view["sources"][1]["status"], "healthy");

    let (status, report) = send(&app, Method::GET, "/api/http-providers/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_source_crud_errors() {
    let (app, aggregator) = app();
    let source = json!({"name": "edge", "url": "http://127.0.0.1:1/config", "is_active": false});

    let (status, created) = send(&app, Method::POST, "/api/http-providers", Some(source.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_u64().unwrap();
    assert!(!aggregator.is_polling(provider_aggregator::registry::SourceId(id)));

    let (status, body) = send(&app, Method::POST, "/api/http-providers", Some(source)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("edge"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "bad", "url": "not a url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "local", "url": "http://127.0.0.1:1/config"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("reserved"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "huge", "url": "http://127.0.0.1:1/config", "refresh_interval": u64::MAX})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/http-providers/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid provider ID");

    let (status, body) = send(&app, Method::POST, "/api/http-providers/999/refresh", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Provider not found");

    let (status, _) = send(&app, Method::DELETE, "/api/http-providers/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/http-providers/{id}");
    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"priority": 7, "refresh_interval": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], 7);
    assert_eq!(updated["refresh_interval"], 30);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_and_test_endpoints() {
    let provider = MockProvider::start(200, &document(&["r"], &[])).await;
    let (app, _) = app();

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/http-providers",
        Some(json!({"name": "edge", "url": provider.url(), "is_active": true})),
    )
    .await;
    let id = created["id"].as_u64().unwrap();

    provider.respond(503, "");
    let (status, tested) = send(&app, Method::POST, &format!("/api/http-providers/{id}/test"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tested["last_error"], "HTTP 503: Service Unavailable");
    assert_eq!(tested["router_count"], 1);

    let (status, body) = send(&app, Method::POST, &format!("/api/http-providers/{id}/refresh"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Refresh triggered");
}
