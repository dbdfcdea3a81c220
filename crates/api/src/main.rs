use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bench_core::cache::CacheStore;
use bench_engine::cache::{CacheBackend, MemoryCacheStore, PgCacheStore};
use bench_engine::durable::PgDurableStore;
use bench_engine::BenchManager;
use bench_events::EventBus;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bench_api::config::ServerConfig;
use bench_api::notifications::EventForwarder;
use bench_api::router::build_app_router;
use bench_api::state::AppState;
use bench_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bench_api=debug,bench_engine=debug,bench_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        cache_backend = ?config.cache_backend,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = bench_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    bench_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    bench_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Engine ---
    let event_bus = Arc::new(EventBus::default());
    let cache: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Postgres => Arc::new(PgCacheStore::new(pool.clone())),
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
    };
    let engine = Arc::new(BenchManager::new(
        config.engine,
        Arc::new(PgDurableStore::new(pool.clone())),
        cache,
        Arc::clone(&event_bus),
    ));
    engine
        .initialize()
        .await
        .expect("Failed to initialize bench engine");

    // --- WebSocket delivery ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let background_cancel = CancellationToken::new();

    let forwarder_handle = tokio::spawn(
        EventForwarder::new(Arc::clone(&ws_manager))
            .run(event_bus.subscribe(), background_cancel.clone()),
    );
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&ws_manager),
        Arc::clone(&event_bus),
        config.heartbeat_interval(),
        background_cancel.clone(),
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        engine: Arc::clone(&engine),
        event_bus,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Flush outstanding bench changes before the forwarder goes away so the
    // last events still reach connected clients.
    engine.shutdown().await;

    background_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), forwarder_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), heartbeat_handle).await;
    tracing::info!("Background tasks stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
