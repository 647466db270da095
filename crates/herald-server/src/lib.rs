//! Herald server library logic.

pub mod api;
pub mod api_events;
pub mod api_notifications;
pub mod api_users;
pub mod api_ws;
pub mod config;
pub mod ingest;
pub mod reconcile;
pub mod registry;
pub mod worker;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Extension, Json, Router,
};
use config::{CorsConfig, QueueBackend, QueueConfig};
use herald_db::DbPool;
use herald_queue::{EventQueue, QueueError, SqliteQueue};
use registry::ConnectionRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across request handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Queue between ingestion and the dispatch worker.
    pub queue: Arc<dyn EventQueue>,
    /// Live connections, keyed by recipient.
    pub registry: ConnectionRegistry,
}

impl AppState {
    pub fn new(pool: DbPool, queue: Arc<dyn EventQueue>) -> Self {
        Self {
            pool,
            queue,
            registry: ConnectionRegistry::new(),
        }
    }
}

/// Errors that can occur when opening the configured queue backend.
#[derive(Debug, Error)]
pub enum QueueSetupError {
    #[error("queue.backend = \"redis\" requires building with the `redis` feature")]
    RedisUnavailable,

    #[error("failed to open queue: {0}")]
    Connect(#[from] QueueError),
}

/// Opens the queue selected by `config`.
pub async fn open_queue(
    config: &QueueConfig,
    pool: DbPool,
) -> Result<Arc<dyn EventQueue>, QueueSetupError> {
    match config.backend {
        QueueBackend::Sqlite => Ok(Arc::new(SqliteQueue::new(pool, config.key.clone()))),
        #[cfg(feature = "redis")]
        QueueBackend::Redis => {
            let queue = herald_queue::RedisQueue::connect(&config.redis_url, config.key.clone())
                .await?;
            Ok(Arc::new(queue))
        }
        #[cfg(not(feature = "redis"))]
        QueueBackend::Redis => Err(QueueSetupError::RedisUnavailable),
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin: {}", e);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Builds the application router with all routes.
pub fn app(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", get(api_users::list_users_handler))
        .route("/api/events", post(api_events::submit_event_handler))
        .route(
            "/api/notifications/{id}",
            get(api_notifications::list_notifications_handler),
        )
        .route(
            "/api/notifications/{id}/read",
            put(api_notifications::mark_read_handler),
        )
        .route("/ws", get(api_ws::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors))
                .layer(Extension(Arc::new(state))),
        )
}
