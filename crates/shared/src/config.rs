//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Exchange rate lookup configuration.
    #[serde(default)]
    pub rates: RatesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// JWT configuration as loaded from files and the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key used to verify tokens.
    pub secret: String,
}

/// Exchange rate lookup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// Base URL of the exchange rate API.
    #[serde(default = "default_rates_url")]
    pub api_url: String,
    /// Request timeout in milliseconds. Rate lookups must never stall a
    /// mutation, so this is kept short and failures fall back to rate 1.
    #[serde(default = "default_rates_timeout_ms")]
    pub timeout_ms: u64,
    /// How long a fetched rate stays cached, in seconds.
    #[serde(default = "default_rates_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_url: default_rates_url(),
            timeout_ms: default_rates_timeout_ms(),
            cache_ttl_secs: default_rates_ttl_secs(),
        }
    }
}

fn default_rates_url() -> String {
    "https://open.er-api.com/v6/latest".to_string()
}

fn default_rates_timeout_ms() -> u64 {
    2000
}

fn default_rates_ttl_secs() -> u64 {
    3600
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
