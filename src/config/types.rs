// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub router: RouterConfig,
    pub store: StoreConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
}

/// Edge router policy.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Root document served for client-side routes (`/` or `/index.html`)
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
    /// Rewrite the fallback response status to 200
    #[serde(default = "default_force_fallback_status_200")]
    pub force_fallback_status_200: bool,
    /// Extensions (lowercase, no dot) that bypass the SPA fallback
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,
    /// Skip edge caching headers and expose error details in bodies
    #[serde(default)]
    pub debug: bool,
    /// `Cache-Control` applied to directly served assets
    #[serde(default)]
    pub cache_control: Option<String>,
    /// Per-fetch budget; a fetch exceeding it counts as failed
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_fallback_path() -> String {
    "/index.html".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_force_fallback_status_200() -> bool {
    true
}

pub const DEFAULT_ASSET_EXTENSIONS: &[&str] = &[
    "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf", "eot",
];

fn default_asset_extensions() -> Vec<String> {
    DEFAULT_ASSET_EXTENSIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[allow(clippy::missing_const_for_fn)]
fn default_fetch_timeout_ms() -> u64 {
    5_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fallback_path: default_fallback_path(),
            force_fallback_status_200: default_force_fallback_status_200(),
            asset_extensions: default_asset_extensions(),
            debug: false,
            cache_control: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Asset store backing the router
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the built application (e.g. `dist`)
    pub root: String,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "dist".to_string(),
            index_files: default_index_files(),
        }
    }
}
