use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the toast settings JSON document (bundled defaults when omitted)
    #[arg(long, env = "TOASTIFY_SETTINGS_PATH")]
    pub settings_path: Option<PathBuf>,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "TOASTIFY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the toast API
    #[arg(long, env = "TOASTIFY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for liveness and readiness probes
    #[arg(long, env = "TOASTIFY_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "TOASTIFY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, mgmt_port: 9090, shutdown_timeout_secs: 10 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SessionBackend {
    #[default]
    Memory,
    Valkey,
}

#[derive(Clone, Debug, Args)]
pub struct SessionConfig {
    /// Where session queues are kept
    #[arg(long, env = "TOASTIFY_SESSION_BACKEND", value_enum, default_value_t = SessionBackend::Memory)]
    pub session_backend: SessionBackend,

    /// Valkey connection URL (used by the valkey backend)
    #[arg(long, env = "TOASTIFY_VALKEY_URL", default_value = "redis://127.0.0.1:6379")]
    pub valkey_url: String,

    /// Idle time after which a session's queue is discarded
    #[arg(long, env = "TOASTIFY_SESSION_TTL_SECS", default_value_t = 7200)]
    pub session_ttl_secs: u64,

    /// How often to reclaim idle sessions and session locks
    #[arg(long, env = "TOASTIFY_GC_INTERVAL_SECS", default_value_t = 60)]
    pub gc_interval_secs: u64,

    /// Request header carrying the session identifier
    #[arg(long, env = "TOASTIFY_SESSION_HEADER", default_value = "x-session-id")]
    pub session_header: String,

    /// Capacity of the toast-created event channel
    #[arg(long, env = "TOASTIFY_EVENT_CHANNEL_CAPACITY", default_value_t = 64)]
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_backend: SessionBackend::Memory,
            valkey_url: "redis://127.0.0.1:6379".to_string(),
            session_ttl_secs: 7200,
            gc_interval_secs: 60,
            session_header: "x-session-id".to_string(),
            event_channel_capacity: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "TOASTIFY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported only when set
    #[arg(long, env = "TOASTIFY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}
