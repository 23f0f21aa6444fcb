//! Resource Registry - central registration of all resources.
//!
//! When adding a new resource:
//! 1. Create the resource file in `definitions/`
//! 2. Export it in `definitions/mod.rs`
//! 3. Register it here in `get_all_resources()` and `build_route_table()`
//!
//! Registration order is also the store's lock order, so `items` must come
//! before `cart`.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::definitions::{
    CartResource, FeedbackResource, FilesResource, ItemsResource, LocationsResource,
    ResourceDefinition, ResourceOptions, UsersResource,
};
use super::handlers::CollectionHandler;
use crate::core::dispatch::{Route, RouteTable};
use crate::core::error::Result;
use crate::domains::store::{Schema, Store};

/// Static description of one registered resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceEntry {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub options: ResourceOptions,
    pub schema: Schema,
}

fn build_entry<R: ResourceDefinition>() -> ResourceEntry {
    ResourceEntry {
        name: R::NAME,
        description: R::DESCRIPTION,
        options: R::options(),
        schema: R::schema(),
    }
}

/// Get all registered resources.
///
/// This is the central place where all resources are registered.
pub fn get_all_resources() -> Vec<ResourceEntry> {
    vec![
        build_entry::<ItemsResource>(),
        build_entry::<FeedbackResource>(),
        build_entry::<LocationsResource>(),
        build_entry::<UsersResource>(),
        build_entry::<CartResource>(),
        build_entry::<FilesResource>(),
    ]
}

/// Create a store with one empty collection per registered resource.
pub fn build_store() -> Store {
    let mut store = Store::new();
    for entry in get_all_resources() {
        store.register(entry.name, entry.schema, entry.options.idempotent_delete);
    }
    info!("Store ready with {} collections", store.names().len());
    store
}

/// Add the generic and custom routes of one resource.
fn add_resource<R: ResourceDefinition>(table: &mut RouteTable, store: &Arc<Store>) -> Result<()> {
    let options = R::options();
    let collection = store.collection(R::NAME)?;

    for &operation in options.operations {
        let route = Route::new(
            operation.method(),
            operation.path(R::NAME),
            Arc::new(CollectionHandler::new(collection.clone(), operation)),
        )
        .protected(options.protected && operation.is_mutation());
        debug!(%route, "Registered route");
        table.add(route);
    }

    for route in R::custom_routes(store)? {
        let protected = options.protected && route.method != http::Method::GET;
        debug!(%route, "Registered custom route");
        table.add(route.protected(protected));
    }
    Ok(())
}

/// Build the route table for every registered resource.
pub fn build_route_table(store: &Arc<Store>) -> Result<RouteTable> {
    let mut table = RouteTable::new();
    add_resource::<ItemsResource>(&mut table, store)?;
    add_resource::<FeedbackResource>(&mut table, store)?;
    add_resource::<LocationsResource>(&mut table, store)?;
    add_resource::<UsersResource>(&mut table, store)?;
    add_resource::<CartResource>(&mut table, store)?;
    add_resource::<FilesResource>(&mut table, store)?;
    info!("Registered {} routes", table.routes().len());
    Ok(table)
}
