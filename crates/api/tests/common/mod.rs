#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use bench_api::config::ServerConfig;
use bench_api::router::build_app_router;
use bench_api::state::AppState;
use bench_api::ws::WsManager;
use bench_db::models::bench::BenchRecord;
use bench_db::models::user::User;
use bench_engine::cache::{CacheBackend, MemoryCacheStore};
use bench_engine::durable::MemoryDurableStore;
use bench_engine::{BenchManager, EngineConfig};
use bench_events::EventBus;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:1212".to_string()],
        request_timeout_secs: 30,
        heartbeat_interval_secs: 30,
        cache_backend: CacheBackend::Memory,
        engine: EngineConfig::default(),
    }
}

/// An initialized engine over in-memory stores, seeded with bench `R42`
/// and users `Ann` and `Bob`.
pub struct TestEngine {
    pub engine: Arc<BenchManager>,
    pub durable: Arc<MemoryDurableStore>,
    pub bus: Arc<EventBus>,
    pub r42: BenchRecord,
    pub ann: User,
    pub bob: User,
}

pub async fn test_engine() -> TestEngine {
    let durable = Arc::new(MemoryDurableStore::new(1));
    let r42 = durable.seed_bench("R42").await;
    let ann = durable.seed_user("Ann").await;
    let bob = durable.seed_user("Bob").await;
    let bus = Arc::new(EventBus::default());
    let engine = Arc::new(BenchManager::new(
        EngineConfig::default(),
        durable.clone(),
        Arc::new(MemoryCacheStore::new()),
        bus.clone(),
    ));
    engine.initialize().await.unwrap();
    TestEngine {
        engine,
        durable,
        bus,
        r42,
        ann,
        bob,
    }
}

/// A pool that never connects unless a handler actually queries it.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/bench_arbiter_test")
        .unwrap()
}

pub fn test_state(pool: PgPool, engine: &TestEngine) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        ws_manager: Arc::new(WsManager::new()),
        engine: Arc::clone(&engine.engine),
        event_bus: Arc::clone(&engine.bus),
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(pool: PgPool, engine: &TestEngine) -> Router {
    build_app_router(test_state(pool, engine), &test_config())
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
