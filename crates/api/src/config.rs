use std::net::SocketAddr;
use std::time::Duration;

use domain::services::{AdmissionConfig, CatalogConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub rsvp: RsvpSettings,
    /// Email service configuration
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            max_connections: cfg.max_connections,
            min_connections: cfg.min_connections,
            connect_timeout_secs: cfg.connect_timeout_secs,
            idle_timeout_secs: cfg.idle_timeout_secs,
        }
    }
}

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// RSVP submissions per client per minute. 0 disables the limiter.
    #[serde(default = "default_rsvp_rate_limit")]
    pub rsvp_rate_limit_per_minute: u32,

    /// Key rate limits on `X-Forwarded-For` / `X-Real-IP`. Enable only when
    /// a reverse proxy overwrites those headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Shared secret expected in `X-Admin-Key`. Empty disables admin routes.
    #[serde(default)]
    pub admin_api_key: String,

    /// Emit `Strict-Transport-Security`. Enable only behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl From<&CatalogSettings> for CatalogConfig {
    fn from(s: &CatalogSettings) -> Self {
        Self {
            default_page_size: s.default_page_size,
            max_page_size: s.max_page_size,
            store_timeout: Duration::from_millis(s.store_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsvpSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Bound of the notification queue between admission and email.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for RsvpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            store_timeout_ms: default_store_timeout_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl From<&RsvpSettings> for AdmissionConfig {
    fn from(s: &RsvpSettings) -> Self {
        Self {
            enabled: s.enabled,
            store_timeout: Duration::from_millis(s.store_timeout_ms),
            lock_timeout: Duration::from_millis(s.lock_timeout_ms),
        }
    }
}

/// Email service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Email provider. Only `console` is built in.
    #[serde(default = "default_email_provider")]
    pub provider: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Receives a copy of every new RSVP. Empty disables admin notices.
    #[serde(default)]
    pub admin_email: String,

    /// Public site URL used to build event links.
    #[serde(default)]
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            admin_email: String::new(),
            base_url: String::new(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rsvp_rate_limit() -> u32 {
    10
}
fn default_page_size() -> u32 {
    shared::pagination::DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> u32 {
    shared::pagination::MAX_PAGE_SIZE
}
fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_lock_timeout_ms() -> u64 {
    10000
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_true() -> bool {
    true
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "noreply@events.example.com".to_string()
}
fn default_sender_name() -> String {
    "Event Manager".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with EM__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("EM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Built from embedded defaults so tests never touch config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""

            [storage]
            backend = "memory"

            [logging]
            level = "info"
            format = "pretty"

            [security]
            cors_origins = []
            rsvp_rate_limit_per_minute = 0
            admin_api_key = "test-admin-key"

            [catalog]
            default_page_size = 10
            max_page_size = 100
            store_timeout_ms = 5000

            [rsvp]
            enabled = true
            store_timeout_ms = 5000
            lock_timeout_ms = 10000
            queue_capacity = 64

            [email]
            enabled = false
            provider = "console"
            sender_email = "events@example.com"
            sender_name = "Test Events"
            admin_email = "admin@example.com"
            base_url = "https://events.example.com"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "EM__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        let max = self.catalog.max_page_size;
        if max == 0 || max > shared::pagination::MAX_PAGE_SIZE {
            return Err(ConfigValidationError::InvalidValue(format!(
                "catalog.max_page_size must be between 1 and {}",
                shared::pagination::MAX_PAGE_SIZE
            )));
        }

        if self.catalog.default_page_size == 0 || self.catalog.default_page_size > max {
            return Err(ConfigValidationError::InvalidValue(format!(
                "catalog.default_page_size must be between 1 and {}",
                max
            )));
        }

        if self.email.enabled && self.email.provider != "console" {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Unknown email provider '{}'",
                self.email.provider
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid socket address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
