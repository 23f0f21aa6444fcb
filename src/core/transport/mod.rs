//! Transport layer for the resource store service.
//!
//! HTTP/1.1 server built on axum. Every resource [`Route`](crate::core::dispatch::Route)
//! registered with the [`StoreServer`](crate::core::StoreServer) is mounted
//! on one axum router next to the fixed service endpoints (`/`, `/health`).

mod config;
mod error;
pub mod http;

pub use config::HttpConfig;
pub use error::TransportError;
pub use self::http::{HttpTransport, build_router};
