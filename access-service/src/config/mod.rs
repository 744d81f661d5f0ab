use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Attempts for the initial connection, including the first one.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay before the first reconnect attempt; doubles on each failure.
    #[serde(default = "default_connect_backoff_secs")]
    pub connect_initial_backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret for bearer tokens.
    pub token_secret: Secret<String>,
    /// Token lifetime, independent of any code's own deadline.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateSettings {
    /// Minimum interval between store-backed session re-checks per identity.
    #[serde(default = "default_check_interval_secs")]
    pub min_check_interval_secs: u64,
    /// Upper bound on tracked identities in the cooldown cache.
    #[serde(default = "default_throttle_capacity")]
    pub throttle_capacity: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            min_check_interval_secs: default_check_interval_secs(),
            throttle_capacity: default_throttle_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_backoff_secs() -> u64 {
    1
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_issuer() -> String {
    "access-service".to_string()
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_throttle_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/base").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
