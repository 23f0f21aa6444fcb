//! Configuration management for the resource store service.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (optionally via a `.env` file) or
//! defaults.

use super::transport::HttpConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Main configuration structure for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// HTTP listener configuration.
    pub http: HttpConfig,

    /// Credentials accepted on protected routes.
    pub auth: AuthConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the service as reported at `/`.
    pub name: String,

    /// The version of the service.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Configuration for request authentication.
///
/// With nothing set, protected routes accept every request.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token accepted on protected routes.
    pub api_token: Option<String>,

    /// Username for HTTP basic authentication.
    pub basic_username: Option<String>,

    /// Password for HTTP basic authentication.
    pub basic_password: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("basic_username", &self.basic_username)
            .field(
                "basic_password",
                &self.basic_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "resource-store".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `STORE_`.
    /// For example: `STORE_SERVER_NAME`, `STORE_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("STORE_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("STORE_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.http = HttpConfig::from_env();

        if let Ok(token) = std::env::var("STORE_API_TOKEN") {
            config.auth.api_token = Some(token);
            info!("API token loaded from environment");
        }

        if let (Ok(username), Ok(password)) = (
            std::env::var("STORE_BASIC_USER"),
            std::env::var("STORE_BASIC_PASSWORD"),
        ) {
            config.auth.basic_username = Some(username);
            config.auth.basic_password = Some(password);
            info!("Basic credentials loaded from environment");
        }

        if config.auth.api_token.is_none() && config.auth.basic_username.is_none() {
            warn!(
                "No credentials configured - protected routes accept all requests. \
                 Set STORE_API_TOKEN or STORE_BASIC_USER/STORE_BASIC_PASSWORD to require them."
            );
        }

        config
    }
}
