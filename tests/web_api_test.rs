use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use photo_chooser::{
    config::Config,
    services::ChooserService,
    web::{AppState, WebServer},
};

fn test_router(dir: &std::path::Path) -> axum::Router {
    let mut config = Config::default();
    config.storage.root = dir.to_path_buf();
    config.storage.app_root = PathBuf::from(".");
    let chooser = ChooserService::from_config(&config).unwrap();
    WebServer::create_router(AppState {
        chooser: Arc::new(chooser),
    })
}

#[tokio::test]
async fn photo_endpoint_answers_with_status_contract() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("urls.txt"), "").unwrap();
    let app = test_router(dir.path());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/photo")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Permissive CORS on the GET surface.
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "failure");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
