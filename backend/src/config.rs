//! Configuration for the clipboard service.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration, built once at startup and passed down.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub oauth2: OAuth2Config,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL (`sqlite:<path>`, a bare path, or `:memory:`)
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, `*` for any.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

impl CorsConfig {
    /// Returns `None` when any origin is allowed.
    pub fn origin_list(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// OAuth2 provider settings.
///
/// Every URL and credential is optional here; the components that need one
/// report a configuration error at request time when it is missing. Empty
/// strings count as unset so that `CLIPBOARD__OAUTH2__SCOPE=` disables a value.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Config {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub userinfo_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    /// Timeout applied to every call to the provider.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            enabled: false,
            userinfo_url: None,
            token_url: None,
            redirect_uri: None,
            client_id: None,
            client_secret: None,
            scope: None,
            audience: None,
            issuer: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OAuth2Config {
    pub fn userinfo_url(&self) -> Option<&str> {
        non_empty(&self.userinfo_url)
    }

    pub fn token_url(&self) -> Option<&str> {
        non_empty(&self.token_url)
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        non_empty(&self.redirect_uri)
    }

    pub fn client_id(&self) -> Option<&str> {
        non_empty(&self.client_id)
    }

    pub fn client_secret(&self) -> Option<&str> {
        non_empty(&self.client_secret)
    }

    pub fn scope(&self) -> Option<&str> {
        non_empty(&self.scope)
    }

    pub fn audience(&self) -> Option<&str> {
        non_empty(&self.audience)
    }

    pub fn issuer(&self) -> Option<&str> {
        non_empty(&self.issuer)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_app_name() -> String {
    "Clipboard API".to_string()
}
fn default_database_url() -> String {
    "sqlite:./data/clipboard.db".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout_secs() -> u64 {
    5
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (CLIPBOARD__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Environment::with_prefix("CLIPBOARD").separator("__"))
    }

    /// Load with an explicit environment source.
    ///
    /// Values stay strings until deserialized, so numeric-looking secrets
    /// keep their leading zeros.
    pub fn load_with(environment: Environment) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("database.url", default_database_url())?
            .set_default("oauth2.enabled", false)?
            .set_default("oauth2.timeout_secs", default_timeout_secs() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }
}
