//! Herald server binary.
//!
//! Starts the axum HTTP/WebSocket server, the dispatch worker and the
//! optional reconciler, with structured logging and graceful shutdown on
//! SIGTERM/SIGINT.

use herald_server::{app, config, open_queue, reconcile, worker, AppState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HERALD_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("herald.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = herald_db::create_pool(
        &config.database.path,
        herald_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool; check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = herald_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
        if config.database.seed_demo_users {
            let seeded =
                herald_db::seed_demo_users(&conn).expect("failed to seed demo directory users");
            if seeded > 0 {
                tracing::info!(count = seeded, "seeded demo users");
            }
        }
    }

    let queue = open_queue(&config.queue, pool.clone())
        .await
        .expect("failed to open event queue; check the [queue] section in config");
    tracing::info!(backend = ?config.queue.backend, queue = %queue.name(), "event queue ready");

    let state = AppState::new(pool, queue);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = tokio::spawn(worker::run(
        state.clone(),
        config.queue.pop_timeout(),
        shutdown_rx.clone(),
    ));
    let reconcile_handle = tokio::spawn(reconcile::start_reconcile_task(
        state.clone(),
        config.worker.clone(),
        shutdown_rx,
    ));

    // Build application
    let app = app(state, &config.cors);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting herald server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The worker notices at its next pop boundary.
    let _ = shutdown_tx.send(true);
    let drain = config.queue.pop_timeout() + Duration::from_secs(5);
    if tokio::time::timeout(drain, worker_handle).await.is_err() {
        tracing::warn!("dispatch worker did not stop in time");
    }
    let _ = reconcile_handle.await;

    tracing::info!("herald server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
