//! Store domain module.
//!
//! In-memory storage for resource collections. The store is the only shared
//! mutable state in the service and exposes nothing but atomic operations:
//!
//! - `schema.rs` - Declared field schemas and the shared validation routine
//! - `collection.rs` - One lock-protected collection with CRUD operations
//! - `transaction.rs` - All-or-nothing writes across several collections
//! - `service.rs` - The store owning every collection

mod collection;
mod entity;
mod error;
mod schema;
mod service;
mod transaction;

pub use collection::{Collection, Removal};
pub use entity::{Entity, EntityId, ID_FIELD};
pub use error::{StoreError, StoreResult};
pub use schema::{FieldChange, FieldKind, FieldSpec, ListFilter, Patch, Schema};
pub use service::Store;
pub use transaction::Transaction;
