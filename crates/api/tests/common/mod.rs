#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use cane_api::config::{ServerConfig, StorageConfig};
use cane_api::router::build_app_router;
use cane_api::state::AppState;
use cane_core::persistence::{MemoryRepository, TelemetryRepository};
use cane_core::service::TelemetryService;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and in-memory storage.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        storage: StorageConfig::Memory,
        autosave_interval_secs: 300,
        flush_every_ingests: 10,
        history_capacity: 1000,
    }
}

/// A router plus handles on the state it serves, so tests can inspect
/// storage side effects.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<TelemetryService>,
    pub repository: Arc<MemoryRepository>,
}

impl TestApp {
    /// Fresh copy of the router for one `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers over an
/// empty in-memory repository.
pub fn build_test_app() -> TestApp {
    build_test_app_with(Arc::new(MemoryRepository::new()))
}

pub fn build_test_app_with(repository: Arc<MemoryRepository>) -> TestApp {
    let config = test_config();
    let service = Arc::new(TelemetryService::new(
        Arc::clone(&repository) as Arc<dyn TelemetryRepository>,
        config.service_options(),
    ));
    let router = router_for(Arc::clone(&service), config);
    TestApp {
        router,
        service,
        repository,
    }
}

/// Build the router around an existing service.
pub fn router_for(service: Arc<TelemetryService>, config: ServerConfig) -> Router {
    build_app_router(AppState { service }, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body with a JSON content type, for malformed-input tests.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
