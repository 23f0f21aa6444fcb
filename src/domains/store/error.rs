//! Store-specific error types.

use thiserror::Error;

use super::entity::EntityId;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request payload failed schema validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: EntityId },

    /// The requested collection is not registered.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A unique field already holds the given value.
    #[error("{0}")]
    Conflict(String),

    /// An internal error occurred (e.g. a stored entity missing a field).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(resource: impl Into<String>, id: EntityId) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a new "conflict" error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
