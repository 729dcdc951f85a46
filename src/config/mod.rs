// Configuration module entry point
// Loads and validates the startup configuration

mod types;

use std::net::SocketAddr;

pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, RouterConfig, ServerConfig, StoreConfig,
    DEFAULT_ASSET_EXTENSIONS,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from `config.toml`, or from the file named by the
    /// first command line argument
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, environment())
    }

    fn load_with_env(
        config_path: &str,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(env)
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "spa-edge/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("router.fallback_path", "/index.html")?
            .set_default("store.root", "dist")?
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.router.normalize().map_err(config::ConfigError::Message)?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// `EDGE_<SECTION>__<KEY>` overrides; list keys take comma separated values
fn environment() -> config::Environment {
    config::Environment::with_prefix("EDGE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("router.asset_extensions")
        .with_list_parse_key("store.index_files")
}

/// Lowercase, no leading dot: `".JS"` becomes `"js"`
pub fn normalize_extension(extension: &str) -> String {
    extension
        .trim()
        .trim_start_matches('.')
        .to_ascii_lowercase()
}

impl RouterConfig {
    /// Validate the fallback path and canonicalise the extension list
    /// (lowercase, no leading dot, no duplicates).
    pub fn normalize(&mut self) -> Result<(), String> {
        if !self.fallback_path.starts_with('/') {
            return Err(format!(
                "router.fallback_path must start with '/': '{}'",
                self.fallback_path
            ));
        }

        let mut extensions: Vec<String> = self
            .asset_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        self.asset_extensions = extensions;
        Ok(())
    }
}
