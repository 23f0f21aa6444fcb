//! Resource definitions module.
//!
//! Each resource is defined in its own file with:
//! - Name and description
//! - Field schema
//! - Exposed operations and delete/auth policy
//! - Any routes beyond the generic CRUD set
//!
//! ## Adding a New Resource
//!
//! 1. Create a new file (e.g., `my_resource.rs`)
//! 2. Implement the `ResourceDefinition` trait
//! 3. Export it here
//! 4. Register in `registry.rs`

use serde::Serialize;
use std::sync::Arc;

use crate::core::dispatch::Route;
use crate::core::error::Result;
use crate::domains::store::{Schema, Store};

mod cart;
mod feedback;
mod files;
mod items;
mod locations;
mod users;

pub use cart::{CartAddHandler, CartRemoveHandler, CartResource};
pub use feedback::FeedbackResource;
pub use files::{FileDownloadHandler, FileUploadHandler, FilesResource};
pub use items::ItemsResource;
pub use locations::LocationsResource;
pub use users::UsersResource;

/// A generic CRUD operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Get,
    Create,
    Replace,
    Patch,
    Delete,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Self::List,
        Self::Get,
        Self::Create,
        Self::Replace,
        Self::Patch,
        Self::Delete,
    ];
}

/// Per-resource policy.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceOptions {
    /// Generic operations exposed for this resource.
    pub operations: &'static [Operation],

    /// Deleting an absent id succeeds instead of returning not found.
    pub idempotent_delete: bool,

    /// Mutating routes require an authenticated principal.
    pub protected: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            operations: Operation::ALL,
            idempotent_delete: false,
            protected: false,
        }
    }
}

/// Trait for resource definitions.
///
/// Each resource must implement this trait to provide its metadata and
/// schema. The registry derives the store collection and the CRUD routes
/// from it.
pub trait ResourceDefinition {
    /// Collection name, also the first path segment.
    const NAME: &'static str;

    /// A description of the resource.
    const DESCRIPTION: &'static str;

    /// Declared fields.
    fn schema() -> Schema;

    fn options() -> ResourceOptions {
        ResourceOptions::default()
    }

    /// Routes beyond the generic CRUD set.
    fn custom_routes(_store: &Arc<Store>) -> Result<Vec<Route>> {
        Ok(Vec::new())
    }
}
