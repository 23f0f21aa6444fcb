//! The process-wide store of resource collections.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::collection::Collection;
use super::error::{StoreError, StoreResult};
use super::schema::Schema;
use super::transaction::Transaction;

/// Owns every collection for the lifetime of the process.
///
/// Collections are registered once at startup; their registration order is
/// the global lock order used by [`Store::transaction`].
#[derive(Debug, Default)]
pub struct Store {
    collections: Vec<Arc<Collection>>,
    by_name: HashMap<String, usize>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection and return a handle to it.
    ///
    /// Registering the same name twice returns the existing collection.
    pub fn register(
        &mut self,
        name: &str,
        schema: Schema,
        idempotent_delete: bool,
    ) -> Arc<Collection> {
        if let Some(&index) = self.by_name.get(name) {
            warn!("Collection '{}' registered twice, keeping the first", name);
            return self.collections[index].clone();
        }

        info!("Registering collection: {}", name);
        let rank = self.collections.len();
        let collection = Arc::new(Collection::new(name, schema, idempotent_delete, rank));
        self.collections.push(collection.clone());
        self.by_name.insert(name.to_string(), rank);
        collection
    }

    pub fn collection(&self, name: &str) -> StoreResult<Arc<Collection>> {
        self.by_name
            .get(name)
            .map(|&index| self.collections[index].clone())
            .ok_or_else(|| StoreError::UnknownResource(name.to_string()))
    }

    /// Names of all collections in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name()).collect()
    }

    /// Run `body` with exclusive access to the named collections.
    ///
    /// Locks are taken in registration order whatever order the names are
    /// given in. Staged writes are committed only if `body` returns `Ok`.
    pub fn transaction<T>(
        &self,
        names: &[&str],
        body: impl FnOnce(&mut Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut ranked = Vec::with_capacity(names.len());
        for name in names {
            let index = *self
                .by_name
                .get(*name)
                .ok_or_else(|| StoreError::UnknownResource(name.to_string()))?;
            ranked.push(index);
        }
        ranked.sort_unstable();
        ranked.dedup();

        let collections = ranked
            .into_iter()
            .map(|index| self.collections[index].as_ref())
            .collect();

        let mut tx = Transaction::begin(collections);
        let value = body(&mut tx)?;
        tx.commit();
        Ok(value)
    }
}
