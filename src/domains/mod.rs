//! Domain modules.
//!
//! - `store` - In-memory collections, validation and transactions
//! - `resources` - The resources exposed over HTTP and their routes

pub mod resources;
pub mod store;
