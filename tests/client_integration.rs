//! End-to-end tests of the client against a mock catalog API.
//!
//! Each test starts an `axum` router on `127.0.0.1:0` and points a fresh
//! [`App`] at it, so requests go through real sockets and real JSON.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use speedscale::app::App;
use speedscale::config::Config;
use speedscale_core::models::ViewState;
use speedscale_core::network_path::NetworkPath;
use speedscale_core::simulate;
use speedscale_core::store::memory::InMemoryStore;

// ============ Mock backend ============

#[derive(Clone)]
struct Mock {
    label: &'static str,
    search_status: Arc<AtomicU16>,
    search_delay_ms: Arc<AtomicU64>,
    health_delay_ms: Arc<AtomicU64>,
    similar_fails: Arc<AtomicBool>,
    trending_fails: Arc<AtomicBool>,
}

impl Mock {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            search_status: Arc::new(AtomicU16::new(200)),
            search_delay_ms: Arc::new(AtomicU64::new(0)),
            health_delay_ms: Arc::new(AtomicU64::new(0)),
            similar_fails: Arc::new(AtomicBool::new(false)),
            trending_fails: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn product_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "price": 49.5,
        "description": "A product",
        "category": "Home",
        "brand": "Acme",
        "inStock": true,
        "rating": 4.2,
        "imageUrl": "https://img.example/1.png",
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

async fn search(
    State(mock): State<Mock>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let delay = mock.search_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = mock.search_status.load(Ordering::SeqCst);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, "boom").into_response();
    }

    let query = params.get("query").cloned().unwrap_or_default();
    let body = if query == "lamp" {
        json!({
            "source": "REDIS_CACHE",
            "time": "12ms",
            "cached": true,
            "count": 2,
            "data": [product_json("p1", "Desk Lamp"), product_json("p2", "Floor Lamp")]
        })
    } else {
        json!({
            "source": "MONGODB_DISK",
            "time": "250ms",
            "cached": false,
            "count": 1,
            "data": [product_json("p3", format!("{} thing", query).as_str())]
        })
    };
    Json(body).into_response()
}

async fn product(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    }
    Json(json!({
        "data": product_json(&id, "Desk Lamp"),
        "source": "MONGODB_DISK",
        "time": "180ms",
        "cached": false
    }))
    .into_response()
}

async fn similar(State(mock): State<Mock>, Path(id): Path<String>) -> Response {
    if mock.similar_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!({ "data": [product_json(&format!("{}-a", id), "Similar A")] })).into_response()
}

async fn health(State(mock): State<Mock>) -> Response {
    let delay = mock.health_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(json!({
        "status": "healthy",
        "timestamp": "2024-01-01T00:00:00Z",
        "connections": { "mongodb": true, "redis": true },
        "servers": { "this_server": mock.label }
    }))
    .into_response()
}

async fn trending(State(mock): State<Mock>) -> Response {
    if mock.trending_fails.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }
    Json(json!(["lamp", "desk", "lamp", "chair", "rug", "desk", "sofa", "bed"])).into_response()
}

/// Serve `mock` on an ephemeral port and return its base URL.
async fn serve(mock: Mock) -> String {
    let router = Router::new()
        .route("/api/search", get(search))
        .route("/api/products/{id}", get(product))
        .route("/api/products/{id}/similar", get(similar))
        .route("/api/trending", get(trending))
        .route("/health", get(health))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn test_config(endpoint: &str) -> Config {
    let mut cfg = Config::minimal();
    cfg.client.default_endpoint = endpoint.to_string();
    cfg
}

async fn app_for(endpoint: &str) -> App {
    App::with_store(Arc::new(InMemoryStore::new()), &test_config(endpoint), false)
        .await
        .unwrap()
}

// ============ Search ============

#[tokio::test]
async fn test_cached_search_records_cache_hit() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;

    app.orchestrator.search("lamp").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.view, ViewState::Results);
    assert_eq!(vm.network_path, NetworkPath::CacheHit);
    assert!(vm.error.is_none());
    let result = vm.result.unwrap();
    assert_eq!(result.count, 2);
    assert_eq!(result.data[0].id, "p1");

    let history = app.session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "Search: \"lamp\"");
    assert_eq!(history[0].latency_ms, 12);
    assert!(history[0].is_cache);
    assert_eq!(history[0].source, "REDIS_CACHE");
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_uncached_search_records_db_miss() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;

    app.orchestrator.search("  chair  ").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.network_path, NetworkPath::DbMiss);
    assert_eq!(vm.query.as_deref(), Some("chair"));
    let history = app.session.history();
    assert_eq!(history[0].latency_ms, 250);
    assert!(!history[0].is_cache);
}

#[tokio::test]
async fn test_server_error_keeps_previous_result() {
    let mock = Mock::new("A");
    let base = serve(mock.clone()).await;
    let app = app_for(&base).await;

    app.orchestrator.search("lamp").await;
    mock.search_status.store(500, Ordering::SeqCst);
    app.orchestrator.search("lamp").await;

    let vm = app.orchestrator.snapshot();
    let err = vm.error.unwrap();
    assert!(err.contains("500"), "unexpected error: {}", err);
    assert_eq!(vm.network_path, NetworkPath::Idle);
    assert!(vm.result.is_some());
    assert_eq!(app.session.history().len(), 1);
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_connection_refused_is_rewritten() {
    let app = app_for(&dead_endpoint()).await;

    app.orchestrator.search("lamp").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(
        vm.error.as_deref(),
        Some("Connection failed. Is the backend server running?")
    );
    assert_eq!(vm.network_path, NetworkPath::Idle);
    assert!(app.session.history().is_empty());
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_loading_flag_spans_request() {
    let mock = Mock::new("A");
    mock.search_delay_ms.store(300, Ordering::SeqCst);
    let base = serve(mock).await;
    let app = app_for(&base).await;

    let orch = app.orchestrator.clone();
    let task = tokio::spawn(async move { orch.search("lamp").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.orchestrator.is_loading());

    task.await.unwrap();
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_concurrent_identical_searches_each_record() {
    let mock = Mock::new("A");
    mock.search_delay_ms.store(200, Ordering::SeqCst);
    let base = serve(mock).await;
    let app = app_for(&base).await;

    let first = {
        let orch = app.orchestrator.clone();
        tokio::spawn(async move { orch.search("lamp").await })
    };
    let second = {
        let orch = app.orchestrator.clone();
        tokio::spawn(async move { orch.search("lamp").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.orchestrator.is_loading());

    first.await.unwrap();
    second.await.unwrap();

    let history = app.session.history();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.action == "Search: \"lamp\""));
    assert_ne!(history[0].id, history[1].id);

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.network_path, NetworkPath::CacheHit);
    assert_eq!(vm.result.map(|r| r.count), Some(2));
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_retry_in_demo_mode_after_failure() {
    let app = app_for(&dead_endpoint()).await;

    app.orchestrator.search("desk").await;
    assert!(app.orchestrator.snapshot().error.is_some());

    app.orchestrator.retry_in_demo_mode().await;

    assert!(app.session.demo_mode());
    let vm = app.orchestrator.snapshot();
    assert!(vm.error.is_none());
    let result = vm.result.unwrap();
    assert!((1..=8).contains(&result.count));
    assert_eq!(app.session.history().len(), 1);
}

// ============ Demo mode ============

#[tokio::test]
async fn test_demo_search_is_delayed_and_bounded() {
    let app = App::with_store(
        Arc::new(InMemoryStore::new()),
        &test_config(&dead_endpoint()),
        true,
    )
    .await
    .unwrap();

    let started = Instant::now();
    app.orchestrator.search("desk").await;
    assert!(started.elapsed() >= Duration::from_millis(600));

    let vm = app.orchestrator.snapshot();
    let result = vm.result.unwrap();
    assert!((1..=8).contains(&result.count));
    assert_eq!(result.data.len(), result.count);
    for p in &result.data {
        assert!(p.id.starts_with(simulate::MOCK_ID_PREFIX));
        assert!(p.price >= 50.0 && p.price < 1050.0);
        assert!(p.rating >= 3.0 && p.rating <= 5.0);
    }

    let latency = app.session.history()[0].latency_ms as u64;
    if result.cached {
        assert_eq!(vm.network_path, NetworkPath::CacheHit);
        assert!(simulate::HIT_LATENCY_MS.contains(&latency));
    } else {
        assert_eq!(vm.network_path, NetworkPath::DbMiss);
        assert!(simulate::MISS_LATENCY_MS.contains(&latency));
    }
}

#[tokio::test]
async fn test_demo_polling_synthesizes_health_and_skips_trending() {
    let mock = Mock::new("A");
    let base = serve(mock).await;
    let app = app_for(&base).await;

    app.poller.refresh_trending().await;
    let before = app.poller.trending();
    assert!(!before.is_empty());

    app.session.set_demo_mode(true);
    app.poller.check_health(false).await;
    app.poller.refresh_trending().await;

    let health = app.poller.health().unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(
        health.servers.get("this_server").map(String::as_str),
        Some("Demo Mode (Local)")
    );
    assert_eq!(app.poller.trending(), before);
}

// ============ Product view ============

#[tokio::test]
async fn test_product_view_records_one_entry_and_swallows_similar_failure() {
    let mock = Mock::new("A");
    mock.similar_fails.store(true, Ordering::SeqCst);
    let base = serve(mock).await;
    let app = app_for(&base).await;

    app.orchestrator.view_product("p9").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.view, ViewState::Product);
    assert_eq!(vm.selected_product.as_deref(), Some("p9"));
    assert!(vm.error.is_none());
    assert!(vm.similar.is_empty());
    assert_eq!(vm.network_path, NetworkPath::DbMiss);
    assert_eq!(vm.product.unwrap().data.id, "p9");

    let history = app.session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "View: Desk Lamp");
    assert_eq!(history[0].latency_ms, 180);
    assert!(!app.orchestrator.is_loading());
}

#[tokio::test]
async fn test_product_view_loads_similar_items() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;

    app.orchestrator.view_product("p1").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.similar.len(), 1);
    assert_eq!(vm.similar[0].id, "p1-a");
}

#[tokio::test]
async fn test_missing_product_surfaces_not_found() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;

    app.orchestrator.view_product("missing").await;

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.error.as_deref(), Some("Product not found"));
    assert!(app.session.history().is_empty());
}

#[tokio::test]
async fn test_back_returns_to_results_and_resets_path() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;

    app.orchestrator.search("lamp").await;
    app.orchestrator.view_product("p1").await;
    assert_eq!(app.orchestrator.network_path(), NetworkPath::DbMiss);

    app.orchestrator.back();

    let vm = app.orchestrator.snapshot();
    assert_eq!(vm.view, ViewState::Results);
    assert_eq!(vm.network_path, NetworkPath::Idle);
    assert!(vm.selected_product.is_none());
}

// ============ Polling ============

#[tokio::test]
async fn test_health_follows_endpoint_change() {
    let base_a = serve(Mock::new("A")).await;
    let base_b = serve(Mock::new("B")).await;
    let app = app_for(&base_a).await;

    app.poller.check_health(false).await;
    let label = |app: &App| {
        app.poller
            .health()
            .and_then(|h| h.servers.get("this_server").cloned())
    };
    assert_eq!(label(&app).as_deref(), Some("A"));

    app.session.set_endpoint(&base_b).await;
    app.poller.check_health(true).await;
    assert_eq!(label(&app).as_deref(), Some("B"));
}

#[tokio::test]
async fn test_health_timeout_resets_to_absent() {
    let mock = Mock::new("A");
    let base = serve(mock.clone()).await;
    let mut cfg = test_config(&base);
    cfg.polling.health_timeout_ms = 100;
    let app = App::with_store(Arc::new(InMemoryStore::new()), &cfg, false)
        .await
        .unwrap();

    app.poller.check_health(false).await;
    assert!(app.poller.health().is_some());

    mock.health_delay_ms.store(1_000, Ordering::SeqCst);
    let started = Instant::now();
    app.poller.check_health(true).await;
    assert!(started.elapsed() < Duration::from_millis(900));
    assert!(app.poller.health().is_none());
}

#[tokio::test]
async fn test_unreachable_health_is_absent() {
    let app = app_for(&dead_endpoint()).await;
    app.poller.check_health(false).await;
    assert!(app.poller.health().is_none());
    assert!(app.orchestrator.snapshot().error.is_none());
}

#[tokio::test]
async fn test_trending_deduped_capped_and_sticky_on_failure() {
    let mock = Mock::new("A");
    let base = serve(mock.clone()).await;
    let app = app_for(&base).await;

    app.poller.refresh_trending().await;
    let expected = vec!["lamp", "desk", "chair", "rug", "sofa"];
    assert_eq!(app.poller.trending(), expected);

    mock.trending_fails.store(true, Ordering::SeqCst);
    app.poller.refresh_trending().await;
    assert_eq!(app.poller.trending(), expected);
}

#[tokio::test]
async fn test_started_poller_publishes_and_stops() {
    let base = serve(Mock::new("A")).await;
    let app = app_for(&base).await;
    let mut health = app.poller.subscribe_health();

    let handle = app.poller.clone().start(CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(5), health.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(health.borrow().is_some());
    assert!(handle.is_running());

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .unwrap();
}

// ============ Epoch ============

#[tokio::test]
async fn test_response_from_previous_endpoint_is_discarded() {
    let mock = Mock::new("A");
    mock.search_delay_ms.store(300, Ordering::SeqCst);
    let base = serve(mock).await;
    let other = serve(Mock::new("B")).await;
    let app = app_for(&base).await;

    let orch = app.orchestrator.clone();
    let task = tokio::spawn(async move { orch.search("lamp").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    app.session.set_endpoint(&other).await;
    task.await.unwrap();

    let vm = app.orchestrator.snapshot();
    assert!(vm.result.is_none());
    assert!(vm.error.is_none());
    assert!(app.session.history().is_empty());
    assert!(!app.orchestrator.is_loading());
}

// ============ Persistence ============

#[tokio::test]
async fn test_history_and_endpoint_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let base = serve(Mock::new("A")).await;
    let mut cfg = test_config("http://localhost:8000");
    cfg.storage.path = tmp.path().join("data").join("speedscale.sqlite");

    {
        let app = App::open(&cfg, false).await.unwrap();
        app.session.set_endpoint(&format!("{}/", base)).await;
        app.orchestrator.search("lamp").await;
        app.orchestrator.search("chair").await;
    }

    let app = App::open(&cfg, false).await.unwrap();
    assert_eq!(app.session.endpoint(), base);
    let history = app.session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, "Search: \"chair\"");

    app.session.clear_history().await.unwrap();
    drop(app);

    let app = App::open(&cfg, false).await.unwrap();
    assert!(app.session.history().is_empty());
}
