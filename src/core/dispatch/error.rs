//! Request-level error kinds and their single status mapping.

use http::StatusCode;
use thiserror::Error;

use crate::core::security::AuthError;
use crate::domains::store::StoreError;

/// Result type for handlers and the dispatcher.
pub type ApiResult<T> = Result<T, ApiError>;

/// Every way a request can fail.
///
/// Handlers return these; only [`ApiError::status_code`] decides which HTTP
/// status each kind becomes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, empty or mistyped input, malformed JSON, bad path id.
    #[error("{0}")]
    BadRequest(String),

    /// Credentials missing or rejected on a protected route.
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown route or entity.
    #[error("{0}")]
    NotFound(String),

    /// The path exists but not for this method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// A unique field collides with an existing entity.
    #[error("{0}")]
    Conflict(String),

    /// The request body exceeds the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Anything unexpected. The message is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(msg) => Self::BadRequest(msg),
            err @ StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            err @ StoreError::UnknownResource(_) => Self::NotFound(err.to_string()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}
