//! End-to-end scenarios for the respond cycle, driven against local mock
//! HTTP servers standing in for the image hosts and the shrink API.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use photo_chooser::{
    config::Config,
    models::{CacheState, ResponseStatus},
    services::ChooserService,
};

/// Bind a mock server on an ephemeral port and return its base URL.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Config rooted in a temp dir with no API key.
fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.root = dir.to_path_buf();
    config.storage.app_root = PathBuf::from(".");
    config
}

#[derive(Clone, Default)]
struct ImageHost {
    hits: Arc<AtomicUsize>,
}

fn image_router(host: ImageHost, status: StatusCode) -> Router {
    Router::new().route(
        "/x.jpg",
        get(move |State(host): State<ImageHost>| async move {
            host.hits.fetch_add(1, Ordering::SeqCst);
            (status, [(header::CONTENT_TYPE, "image/png")], "png-bytes")
        })
        .with_state(host),
    )
}

#[tokio::test]
async fn empty_source_list_yields_failure() {
    // Scenario A: nothing to choose from at all.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("urls.txt"), "").unwrap();

    let chooser = ChooserService::from_config(&test_config(dir.path())).unwrap();
    let response = chooser.respond().await;

    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(response.data.is_none());
}

#[tokio::test]
async fn valid_url_without_api_key_is_selected_uncached() {
    // Scenario B: one fetchable URL, compression disabled.
    let dir = tempfile::tempdir().unwrap();
    let host = ImageHost::default();
    let base = spawn_server(image_router(host.clone(), StatusCode::OK)).await;
    let url = format!("{}/x.jpg", base);
    std::fs::write(dir.path().join("urls.txt"), format!("{}\n", url)).unwrap();

    let chooser = ChooserService::from_config(&test_config(dir.path())).unwrap();
    let response = chooser.respond().await;

    assert_eq!(response.status, ResponseStatus::Success);
    let record = response.data.unwrap();
    assert_eq!(record.url, url);
    assert_eq!(record.state, CacheState::Pending);
    assert_eq!(record.mime_type.as_deref(), Some("image/png"));

    // Both stores were persisted and stayed consistent.
    let manifest = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    assert!(manifest.contains(&url));
    let urls = std::fs::read_to_string(dir.path().join("urls.txt")).unwrap();
    assert_eq!(urls, format!("{}\n", url));
}

#[tokio::test]
async fn fetch_404_excludes_record_and_empties_url_list() {
    // Scenario C: the only candidate 404s.
    let dir = tempfile::tempdir().unwrap();
    let host = ImageHost::default();
    let base = spawn_server(image_router(host.clone(), StatusCode::NOT_FOUND)).await;
    std::fs::write(dir.path().join("urls.txt"), format!("{}/x.jpg\n", base)).unwrap();

    let chooser = ChooserService::from_config(&test_config(dir.path())).unwrap();
    let response = chooser.respond().await;

    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(response.data.is_none());
    let urls = std::fs::read_to_string(dir.path().join("urls.txt")).unwrap();
    assert!(urls.is_empty());
}

#[tokio::test]
async fn unchanged_source_list_skips_all_network_work() {
    // Scenario E plus the idempotence property: the second respond cycle
    // performs no fetches and leaves the manifest byte-identical.
    let dir = tempfile::tempdir().unwrap();
    let host = ImageHost::default();
    let base = spawn_server(image_router(host.clone(), StatusCode::OK)).await;
    std::fs::write(dir.path().join("urls.txt"), format!("{}/x.jpg\n", base)).unwrap();

    let chooser = ChooserService::from_config(&test_config(dir.path())).unwrap();

    let first = chooser.respond().await;
    assert_eq!(first.status, ResponseStatus::Success);
    assert_eq!(host.hits.load(Ordering::SeqCst), 1);
    let manifest_after_first = std::fs::read(dir.path().join("manifest.json")).unwrap();

    let second = chooser.respond().await;
    assert_eq!(second.status, ResponseStatus::Success);
    assert_eq!(host.hits.load(Ordering::SeqCst), 1);
    let manifest_after_second = std::fs::read(dir.path().join("manifest.json")).unwrap();
    assert_eq!(manifest_after_first, manifest_after_second);
}

#[derive(Clone, Default)]
struct ShrinkApi {
    hits: Arc<AtomicUsize>,
    auth: Arc<Mutex<Option<String>>>,
    output_base: Arc<Mutex<String>>,
}

fn shrink_router(api: ShrinkApi) -> Router {
    Router::new()
        .route(
            "/shrink",
            post(
                move |State(api): State<ShrinkApi>, headers: HeaderMap| async move {
                    api.hits.fetch_add(1, Ordering::SeqCst);
                    *api.auth.lock().unwrap() = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|value| value.to_str().ok())
                        .map(String::from);
                    let base = api.output_base.lock().unwrap().clone();
                    (
                        StatusCode::CREATED,
                        Json(json!({
                            "output": {
                                "url": format!("{}/output/2xn1kvgu", base),
                                "type": "image/png"
                            }
                        })),
                    )
                },
            ),
        )
        .route(
            "/output/2xn1kvgu",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], "shrunk-bytes") }),
        )
        .with_state(api)
}

#[tokio::test]
async fn compression_caches_asset_locally_and_rewrites_record() {
    // Scenario D, then a second cycle proving the cached record is never
    // resubmitted.
    let dir = tempfile::tempdir().unwrap();
    let host = ImageHost::default();
    let image_base = spawn_server(image_router(host.clone(), StatusCode::OK)).await;
    let source_url = format!("{}/x.jpg", image_base);
    std::fs::write(dir.path().join("urls.txt"), format!("{}\n", source_url)).unwrap();

    let api = ShrinkApi::default();
    let shrink_base = spawn_server(shrink_router(api.clone())).await;
    *api.output_base.lock().unwrap() = shrink_base.clone();

    let mut config = test_config(dir.path());
    config.shrink.api_key = Some("test-key".to_string());
    config.shrink.endpoint = format!("{}/shrink", shrink_base);

    let chooser = ChooserService::from_config(&config).unwrap();
    let response = chooser.respond().await;

    assert_eq!(response.status, ResponseStatus::Success);
    let record = response.data.unwrap();
    assert_eq!(record.url, "cache/2xn1kvgu.png");
    assert_eq!(record.state, CacheState::Cached);
    assert_eq!(record.original_url.as_deref(), Some(source_url.as_str()));
    assert_eq!(record.mime_type.as_deref(), Some("image/png"));
    assert!(record.last_cached.is_some());

    let cached = std::fs::read(dir.path().join("cache/2xn1kvgu.png")).unwrap();
    assert_eq!(cached, b"shrunk-bytes");

    // Credential was passed through as basic auth.
    let auth = api.auth.lock().unwrap().clone().unwrap();
    assert!(auth.starts_with("Basic "));

    // Second cycle: hash-stable fast path, cached record skipped.
    let again = chooser.respond().await;
    assert_eq!(again.status, ResponseStatus::Success);
    assert_eq!(api.hits.load(Ordering::SeqCst), 1);
    assert_eq!(host.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_compression_keeps_other_records_alive() {
    // A non-created shrink response errors the record but the batch and the
    // manifest survive.
    let dir = tempfile::tempdir().unwrap();
    let host = ImageHost::default();
    let image_base = spawn_server(image_router(host.clone(), StatusCode::OK)).await;
    std::fs::write(
        dir.path().join("urls.txt"),
        format!("{}/x.jpg\n", image_base),
    )
    .unwrap();

    let failing = Router::new().route(
        "/shrink",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let shrink_base = spawn_server(failing).await;

    let mut config = test_config(dir.path());
    config.shrink.api_key = Some("bad-key".to_string());
    config.shrink.endpoint = format!("{}/shrink", shrink_base);

    let chooser = ChooserService::from_config(&config).unwrap();
    let response = chooser.respond().await;

    // The only record errored during compression, so selection fails, but
    // the manifest recorded the attempt.
    assert_eq!(response.status, ResponseStatus::Failure);
    let manifest = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    assert!(manifest.contains("\"error\":401"));
}
