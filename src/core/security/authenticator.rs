use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::core::config::AuthConfig;

/// Errors that can occur while authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("malformed Authorization header: {0}")]
    MalformedHeader(String),
}

/// Credentials presented with a request.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
    /// A header that could not be decoded; rejected on protected routes.
    Malformed(String),
}

impl Credentials {
    /// Parse an `Authorization` header value.
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        let Some((scheme, rest)) = value.split_once(' ') else {
            return Self::Malformed(format!("missing scheme in '{value}'"));
        };
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("bearer") {
            return Self::Bearer(rest.to_string());
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = match STANDARD.decode(rest) {
                Ok(bytes) => bytes,
                Err(e) => return Self::Malformed(format!("invalid base64: {e}")),
            };
            let Ok(decoded) = String::from_utf8(decoded) else {
                return Self::Malformed("credentials are not UTF-8".to_string());
            };
            return match decoded.split_once(':') {
                Some((username, password)) => Self::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                },
                None => Self::Malformed("expected username:password".to_string()),
            };
        }
        Self::Malformed(format!("unsupported scheme '{scheme}'"))
    }
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Malformed(reason) => f.debug_tuple("Malformed").field(reason).finish(),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
        }
    }
}

/// Pluggable authentication capability.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name for logs.
    fn scheme(&self) -> &'static str;

    async fn validate(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}

/// Accepts every request as anonymous.
pub struct OpenAuthenticator;

#[async_trait]
impl Authenticator for OpenAuthenticator {
    fn scheme(&self) -> &'static str {
        "open"
    }

    async fn validate(&self, _credentials: &Credentials) -> Result<Principal, AuthError> {
        Ok(Principal::anonymous())
    }
}

/// Accepts a single static bearer token.
pub struct TokenAuthenticator {
    token: String,
}

impl TokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    fn scheme(&self) -> &'static str {
        "bearer"
    }

    async fn validate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match credentials {
            Credentials::Bearer(token) if constant_time_eq(token, &self.token) => Ok(Principal {
                name: "token".to_string(),
            }),
            Credentials::None => Err(AuthError::MissingCredentials),
            Credentials::Malformed(reason) => Err(AuthError::MalformedHeader(reason.clone())),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Accepts a single username/password pair.
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    async fn validate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match credentials {
            Credentials::Basic { username, password }
                if username == &self.username && constant_time_eq(password, &self.password) =>
            {
                Ok(Principal {
                    name: username.clone(),
                })
            }
            Credentials::None => Err(AuthError::MissingCredentials),
            Credentials::Malformed(reason) => Err(AuthError::MalformedHeader(reason.clone())),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Build the authenticator selected by configuration.
///
/// A bearer token takes precedence over basic credentials; with neither
/// configured every request is accepted.
pub fn authenticator_from_config(config: &AuthConfig) -> Box<dyn Authenticator> {
    if let Some(token) = &config.api_token {
        return Box::new(TokenAuthenticator::new(token.clone()));
    }
    if let (Some(username), Some(password)) = (&config.basic_username, &config.basic_password) {
        return Box::new(BasicAuthenticator::new(username.clone(), password.clone()));
    }
    Box::new(OpenAuthenticator)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
