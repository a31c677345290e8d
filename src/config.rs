use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoConfig {
    #[serde(default = "default_geo_base_url")]
    pub base_url: String,
    /// Upper bound on a single lookup. Unset means wait for the upstream indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_geo_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_geo_base_url() -> String {
    "http://ip-api.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_secs: default_session_ttl(),
            secure: false,
        }
    }
}

fn default_cookie_name() -> String {
    "footfall_session".to_string()
}

fn default_session_ttl() -> u64 {
    86400 // 1 day
}

impl AppConfig {
    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.pool_size == 0 {
            return Err("database.pool_size must be at least 1".to_string());
        }

        if self.geo.base_url.trim().is_empty() {
            return Err("geo.base_url must be set. \
                 Set it in config.toml or via FOOTFALL__GEO__BASE_URL env var."
                .to_string());
        }
        let parsed = url::Url::parse(&self.geo.base_url)
            .map_err(|e| format!("geo.base_url is not a valid URL: {e}"))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(format!("geo.base_url has unsupported scheme: {scheme}")),
        }
        if parsed.cannot_be_a_base() {
            return Err("geo.base_url cannot be used as a base URL".to_string());
        }

        let name = &self.session.cookie_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!(
                "session.cookie_name must be non-empty and contain only [A-Za-z0-9_-], got {name:?}"
            ));
        }
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "footfall.db")?;

        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (FOOTFALL__SERVER__PORT=3001, etc.)
        builder = builder.add_source(
            Environment::with_prefix("FOOTFALL")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
