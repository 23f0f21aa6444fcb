//! Resources domain module.
//!
//! A resource is a named collection exposed over HTTP. Each one declares its
//! schema and policy once; the store collection and the routes are derived
//! from that declaration.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual resource definitions (one file per resource)
//! - `handlers.rs` - Generic CRUD handler shared by plain collections
//! - `registry.rs` - Central resource registration
//!
//! ## Adding a New Resource
//!
//! 1. Create a new file in `definitions/` (e.g., `my_resource.rs`)
//! 2. Implement the `ResourceDefinition` trait
//! 3. Export in `definitions/mod.rs`
//! 4. Register in `registry.rs`

pub mod definitions;
mod handlers;
mod registry;

pub use definitions::{Operation, ResourceDefinition, ResourceOptions};
pub use handlers::CollectionHandler;
pub use registry::{ResourceEntry, build_route_table, build_store, get_all_resources};
