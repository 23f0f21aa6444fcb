//! Store server implementation.
//!
//! `StoreServer` owns the store, the route table and the authenticator.
//! Transports mount its routes and ask it to authenticate callers of
//! protected ones; they never look inside the store.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::config::Config;
use super::dispatch::{ApiResult, RouteTable};
use super::error::Result;
use super::security::{Authenticator, Credentials, Principal, authenticator_from_config};
use crate::domains::resources::{build_route_table, build_store, get_all_resources};
use crate::domains::store::Store;

/// The resource store server.
///
/// Cheap to clone; every clone shares the same store.
#[derive(Clone)]
pub struct StoreServer {
    /// Server configuration.
    config: Arc<Config>,

    /// All collections.
    store: Arc<Store>,

    /// Routes for every registered resource.
    routes: Arc<RouteTable>,

    /// Validates credentials on protected routes.
    authenticator: Arc<dyn Authenticator>,
}

impl StoreServer {
    /// Create a new server with empty collections.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(build_store());
        let routes = build_route_table(&store)?;
        let authenticator: Arc<dyn Authenticator> =
            Arc::from(authenticator_from_config(&config.auth));
        info!(
            "Server initialized with {} routes, authentication: {}",
            routes.routes().len(),
            authenticator.scheme()
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            routes: Arc::new(routes),
            authenticator,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Every resource route, in registration order.
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Describe every registered resource and its routes.
    pub fn resources(&self) -> Vec<Value> {
        get_all_resources()
            .into_iter()
            .map(|entry| {
                let prefix = format!("/{}", entry.name);
                let routes: Vec<String> = self
                    .routes
                    .routes()
                    .iter()
                    .filter(|r| r.path == prefix || r.path.starts_with(&format!("{prefix}/")))
                    .map(ToString::to_string)
                    .collect();
                let mut value = serde_json::to_value(&entry).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.insert("routes".to_string(), routes.into());
                }
                value
            })
            .collect()
    }

    /// Check the credentials presented to a protected route.
    #[instrument(skip_all, fields(scheme = self.authenticator.scheme()))]
    pub async fn authenticate(&self, credentials: &Credentials) -> ApiResult<Principal> {
        match self.authenticator.validate(credentials).await {
            Ok(principal) => {
                debug!(principal = %principal.name, "Authenticated");
                Ok(principal)
            }
            Err(e) => {
                warn!("Rejected request to protected route: {}", e);
                Err(e.into())
            }
        }
    }
}
