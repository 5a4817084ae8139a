// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatvault archiver.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Chatvault configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatvaultConfig {
    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote source adapter settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Ingestion pacing and scheduler settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the gateway to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to bind the gateway to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on every authenticated endpoint.
    /// `None` leaves the authenticated surface closed (only `/health`
    /// answers).
    #[serde(default)]
    pub api_token: Option<String>,

    /// Allowed CORS origins. Empty list allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_token: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8550
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatvault").join("chatvault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatvault.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Remote source adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Adapter to use. `replay` serves messages from a JSON fixture file;
    /// it is the only adapter that ships with the archiver.
    #[serde(default = "default_source_kind")]
    pub kind: String,

    /// Path to the replay fixture file (required when `kind = "replay"`).
    #[serde(default)]
    pub replay_path: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            replay_path: None,
        }
    }
}

fn default_source_kind() -> String {
    "replay".to_string()
}

/// Ingestion pacing and scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Sustained remote request rate in tokens per second.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Token bucket burst capacity.
    #[serde(default = "default_burst")]
    pub burst: f64,

    /// Messages requested per backfill page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on pages fetched by a single load_history task.
    #[serde(default = "default_max_pages_per_task")]
    pub max_pages_per_task: usize,

    /// Seconds between automatic missed-message sweeps. 0 disables the
    /// periodic producer.
    #[serde(default = "default_missed_check_interval_secs")]
    pub missed_check_interval_secs: u64,

    /// Maximum chats enqueued per missed-message sweep.
    #[serde(default = "default_missed_check_chat_limit")]
    pub missed_check_chat_limit: usize,

    /// Retry attempts for transient source failures.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base delay in milliseconds between retry attempts (doubles per try).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            page_size: default_page_size(),
            max_pages_per_task: default_max_pages_per_task(),
            missed_check_interval_secs: default_missed_check_interval_secs(),
            missed_check_chat_limit: default_missed_check_chat_limit(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_requests_per_second() -> f64 {
    1.0
}

fn default_burst() -> f64 {
    3.0
}

fn default_page_size() -> usize {
    50
}

fn default_max_pages_per_task() -> usize {
    200
}

fn default_missed_check_interval_secs() -> u64 {
    300
}

fn default_missed_check_chat_limit() -> usize {
    20
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
