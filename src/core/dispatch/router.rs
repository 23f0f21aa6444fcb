//! Resource routes: which handler serves which method and path.
//!
//! Paths use axum's syntax. The only parameter resource routes take is the
//! entity id, written `{id}`; the transport extracts it as a `u64`.

use async_trait::async_trait;
use http::Method;
use std::fmt;
use std::sync::Arc;

use super::error::ApiResult;
use super::request::RequestContext;
use super::response::Outcome;

/// Path segment carrying the entity id.
pub const ID_SEGMENT: &str = "{id}";

/// The unit of logic serving one (resource, operation) pair.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome>;
}

/// A registered route.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    /// Whether the route requires an authenticated principal.
    pub protected: bool,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            path: path.into(),
            protected: false,
            handler,
        }
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Whether the path has an `{id}` segment.
    pub fn takes_id(&self) -> bool {
        self.path.split('/').any(|segment| segment == ID_SEGMENT)
    }

    /// Whether the handler reads a request body. Bodies sent to other
    /// routes are ignored.
    pub fn takes_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("protected", &self.protected)
            .finish()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// All routes of the service, in registration order.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The route registered for exactly this method and path.
    pub fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.method == *method && r.path == path)
    }
}
