//! Configuration model loaded from external sources.

use serde::Deserialize;

/// Login throttling settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_seconds: 60,
        }
    }
}

fn default_access_ttl() -> i64 {
    60
}

fn default_refresh_ttl() -> i64 {
    1
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[derive(Clone, Debug, Deserialize)]
/// Settings shared by the HTTP server, the worker and the management CLI.
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub database_url: String,
    pub secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default)]
    pub login_rate_limit: RateLimitConfig,
    /// Endpoint the web application PUSHes tasks to.
    pub zmq_tasks_push: String,
    /// Endpoint the worker binds its PULL socket on.
    pub zmq_tasks_pull: String,
    pub export_dir: String,
    pub backup_dir: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Loads `config/default.yaml`, the optional `config/{APP_ENV}.yaml`
    /// overlay and `APP_*` environment variables, in that order.
    pub fn load() -> Result<Self, config::ConfigError> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        Self::load_from("config", &app_env)
    }

    pub fn load_from(dir: &str, app_env: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")))
            .add_source(config::File::with_name(&format!("{dir}/{app_env}")).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<ServerConfig>()
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;

    #[test]
    fn overlay_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "address: 127.0.0.1\nport: 8000\ndatabase_url: app.db\nsecret: s\n\
             zmq_tasks_push: tcp://127.0.0.1:5560\nzmq_tasks_pull: tcp://127.0.0.1:5560\n\
             export_dir: exports\nbackup_dir: backups\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("staging.yaml"), "port: 9000\n").unwrap();

        let dir_str = dir.path().to_str().unwrap();
        let staging = ServerConfig::load_from(dir_str, "staging").unwrap();
        assert_eq!(staging.port, 9000);
        assert_eq!(staging.access_token_ttl_minutes, 60);
        assert_eq!(staging.login_rate_limit, RateLimitConfig::default());

        let missing_overlay = ServerConfig::load_from(dir_str, "qa").unwrap();
        assert_eq!(missing_overlay.port, 8000);
    }
}
