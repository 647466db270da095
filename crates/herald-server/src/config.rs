//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Durable queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Dispatch worker and reconciler settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Cross-origin settings for browser clients.
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Insert the demo directory users at startup.
    #[serde(default = "default_true")]
    pub seed_demo_users: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "herald_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Which queue implementation carries events to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// The `event_queue` table in the main database.
    #[default]
    Sqlite,
    /// A Redis list (requires the `redis` feature).
    Redis,
}

impl std::str::FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown queue backend: {other}")),
        }
    }
}

/// Durable queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,

    /// Redis connection URL, used when `backend = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Redis list key, or the queue name within `event_queue`.
    #[serde(default = "default_queue_key")]
    pub key: String,

    /// How long one worker pop waits before re-checking for shutdown.
    /// Values below one second are raised to one second.
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,
}

impl QueueConfig {
    /// Pop timeout as a [`Duration`], never zero.
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_secs(self.pop_timeout_secs.max(1))
    }
}

/// Dispatch worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between reconciler sweeps; `0` disables the reconciler.
    #[serde(default)]
    pub reconcile_interval_secs: u64,

    /// Minimum age of an unprocessed event before it is re-enqueued.
    #[serde(default = "default_reconcile_grace_secs")]
    pub reconcile_grace_secs: u64,

    /// Maximum events re-enqueued per sweep.
    #[serde(default = "default_reconcile_batch")]
    pub reconcile_batch: u32,

    /// How many times one event is re-enqueued before the reconciler gives
    /// up on it.
    #[serde(default = "default_reconcile_max_attempts")]
    pub reconcile_max_attempts: u32,
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "herald.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_key() -> String {
    herald_queue::DEFAULT_QUEUE_NAME.to_string()
}

fn default_pop_timeout_secs() -> u64 {
    5
}

fn default_reconcile_grace_secs() -> u64 {
    60
}

fn default_reconcile_batch() -> u32 {
    100
}

fn default_reconcile_max_attempts() -> u32 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            seed_demo_users: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            redis_url: default_redis_url(),
            key: default_queue_key(),
            pop_timeout_secs: default_pop_timeout_secs(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 0,
            reconcile_grace_secs: default_reconcile_grace_secs(),
            reconcile_batch: default_reconcile_batch(),
            reconcile_max_attempts: default_reconcile_max_attempts(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HERALD_HOST` overrides `server.host`
/// - `HERALD_PORT` overrides `server.port`
/// - `HERALD_DB_PATH` overrides `database.path`
/// - `HERALD_LOG_LEVEL` overrides `logging.level`
/// - `HERALD_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `HERALD_QUEUE_BACKEND` overrides `queue.backend`
/// - `HERALD_REDIS_URL` overrides `queue.redis_url`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("HERALD_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("HERALD_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("HERALD_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("HERALD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("HERALD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(backend) = std::env::var("HERALD_QUEUE_BACKEND") {
        match backend.parse() {
            Ok(parsed) => config.queue.backend = parsed,
            Err(e) => tracing::warn!("ignoring HERALD_QUEUE_BACKEND: {}", e),
        }
    }
    if let Ok(url) = std::env::var("HERALD_REDIS_URL") {
        config.queue.redis_url = url;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "herald.db");
        assert!(config.database.seed_demo_users);
        assert_eq!(config.queue.backend, QueueBackend::Sqlite);
        assert_eq!(config.queue.key, "notification_queue");
        assert_eq!(config.queue.pop_timeout(), Duration::from_secs(5));
        assert_eq!(config.worker.reconcile_interval_secs, 0);
        assert_eq!(config.worker.reconcile_max_attempts, 5);
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [queue]
            backend = "redis"
            key = "herald:events"
            pop_timeout_secs = 1

            [worker]
            reconcile_interval_secs = 30
            reconcile_batch = 10

            [cors]
            allowed_origins = ["http://localhost:5173"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.backend, QueueBackend::Redis);
        assert_eq!(config.queue.key, "herald:events");
        assert_eq!(config.worker.reconcile_interval_secs, 30);
        assert_eq!(config.worker.reconcile_grace_secs, 60);
        assert_eq!(config.worker.reconcile_batch, 10);
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn zero_pop_timeout_is_raised_to_one_second() {
        let config: Config =
            toml::from_str("[queue]\npop_timeout_secs = 0").expect("config should parse");
        assert_eq!(config.queue.pop_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(toml::from_str::<Config>("[queue]\nbackend = \"kafka\"").is_err());
        assert!("Kafka".parse::<QueueBackend>().is_err());
        assert_eq!(" REDIS ".parse::<QueueBackend>(), Ok(QueueBackend::Redis));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("missing file is not an error");
        assert_eq!(config.queue.key, "notification_queue");
    }
}
