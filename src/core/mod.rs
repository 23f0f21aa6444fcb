//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the service,
//! including error handling, configuration, request dispatch, authentication
//! and the HTTP transport.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod security;
pub mod server;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use server::StoreServer;
pub use transport::{HttpConfig, HttpTransport};
