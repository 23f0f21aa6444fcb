//! Resource Store Service Library
//!
//! An HTTP service exposing named in-memory collections (items, feedback,
//! locations, users, cart, files) with create, read, update and delete
//! operations, schema validation and a stock-reserving cart.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, request dispatch, authentication
//!   and the HTTP transport
//! - **domains**: Business logic organized by bounded contexts
//!   - **store**: Concurrent in-memory collections and transactions
//!   - **resources**: The resources exposed over HTTP and their routes
//!
//! # Example
//!
//! ```rust,no_run
//! use resource_store_service::core::{Config, HttpTransport, StoreServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = StoreServer::new(config.clone())?;
//!     HttpTransport::new(config.http).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, Result, StoreServer};
