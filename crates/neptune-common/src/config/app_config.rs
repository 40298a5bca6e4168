//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// WebSocket server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path upgraded to a WebSocket connection
    pub ws_path: String,
    pub tls: Option<TlsConfig>,
    pub static_files: Option<StaticFilesConfig>,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            tls: None,
            static_files: None,
        }
    }
}

/// PEM certificate and key used for `wss://`
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Directory served as static files under a URL prefix
#[derive(Debug, Clone)]
pub struct StaticFilesConfig {
    pub prefix: String,
    pub dir: PathBuf,
}

/// Demo client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` the client dials
    pub target: String,
    pub ws_path: String,
}

// Default value functions
fn default_app_name() -> String {
    "neptune".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7777
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_client_target() -> String {
    "127.0.0.1:7777".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable holds an invalid value, or if only one of
    /// a required pair (TLS cert/key, static prefix/dir) is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
            None => default_env(),
        };

        let port = match lookup("SERVER_PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT", value))?,
            None => default_port(),
        };

        let ws_path = lookup("WS_PATH").unwrap_or_else(default_ws_path);
        if !ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue("WS_PATH", ws_path));
        }

        let tls = match (lookup("TLS_CERT_PATH"), lookup("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("TLS_KEY_PATH")),
            (None, Some(_)) => return Err(ConfigError::MissingVar("TLS_CERT_PATH")),
        };

        let static_files = match (lookup("STATIC_PREFIX"), lookup("STATIC_DIR")) {
            (Some(prefix), Some(dir)) => Some(StaticFilesConfig {
                prefix,
                dir: dir.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("STATIC_DIR")),
            (None, Some(_)) => return Err(ConfigError::MissingVar("STATIC_PREFIX")),
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(default_host),
                port,
                ws_path: ws_path.clone(),
                tls,
                static_files,
            },
            client: ClientConfig {
                target: lookup("CLIENT_TARGET").unwrap_or_else(default_client_target),
                ws_path,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
