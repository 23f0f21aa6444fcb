//! Error types for server startup and wiring.
//!
//! Request-level failures are [`crate::core::dispatch::ApiError`]; this type
//! covers everything that can go wrong before or around serving requests:
//! building the route table, reading configuration, binding the listener.

use thiserror::Error;

use super::transport::TransportError;
use crate::domains::store::StoreError;

/// A specialized Result type for server setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the service.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors, including routes that cannot be mounted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the store while wiring collections.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error raised by the HTTP transport.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
