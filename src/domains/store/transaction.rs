//! Multi-collection transactions.
//!
//! A [`Transaction`] holds the write locks of every collection it touches,
//! acquired in the store's registration order. Writes are staged against an
//! overlay and only reach the collections in [`Transaction::commit`], which
//! cannot fail. Returning an error from the transaction body therefore
//! leaves every collection exactly as it was.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::RwLockWriteGuard;

use super::collection::{Collection, CollectionData, apply_patch};
use super::entity::{Entity, EntityId};
use super::error::{StoreError, StoreResult};

struct Slot<'a> {
    collection: &'a Collection,
    data: RwLockWriteGuard<'a, CollectionData>,
    /// `Some` is an insert or update, `None` a removal.
    staged: BTreeMap<EntityId, Option<Entity>>,
    next_id: u64,
}

impl Slot<'_> {
    fn name(&self) -> &str {
        self.collection.name()
    }

    fn lookup(&self, id: EntityId) -> Option<Entity> {
        match self.staged.get(&id) {
            Some(staged) => staged.clone(),
            None => self.data.entries.get(&id).map(|r| r.entity.clone()),
        }
    }

    /// Id of the entity holding a unique field value, staged writes applied.
    fn unique_owner(&self, field: &str, value: &Value) -> Option<EntityId> {
        let staged = self
            .staged
            .values()
            .flatten()
            .find(|e| e.fields.get(field) == Some(value));
        if let Some(entity) = staged {
            return Some(entity.id);
        }
        // A staged owner that no longer holds the value was skipped above.
        let owner = self.data.unique_owner(field, value)?;
        (!self.staged.contains_key(&owner)).then_some(owner)
    }

    fn check_unique(
        &self,
        fields: &Map<String, Value>,
        exclude: Option<EntityId>,
    ) -> StoreResult<()> {
        for spec in self.collection.schema().unique_fields() {
            let Some(value) = fields.get(spec.name) else {
                continue;
            };
            match self.unique_owner(spec.name, value) {
                Some(owner) if Some(owner) != exclude => {
                    return Err(StoreError::conflict(format!(
                        "{} {} already exists",
                        spec.name, value
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn commit(mut self) {
        for (id, staged) in std::mem::take(&mut self.staged) {
            match staged {
                Some(entity) => self.data.put(entity, None),
                None => {
                    self.data.remove(id);
                }
            }
        }
        self.data.next_id = self.next_id;
    }
}

/// Exclusive, all-or-nothing access to a set of collections.
pub struct Transaction<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> Transaction<'a> {
    /// Lock the given collections. Callers must pass them sorted by rank
    /// and without duplicates.
    pub(super) fn begin(collections: Vec<&'a Collection>) -> Self {
        debug_assert!(collections.windows(2).all(|w| w[0].rank() < w[1].rank()));

        let mut slots = Vec::with_capacity(collections.len());
        for collection in collections {
            let data = collection.write();
            let next_id = data.next_id;
            slots.push(Slot {
                collection,
                data,
                staged: BTreeMap::new(),
                next_id,
            });
        }
        Self { slots }
    }

    fn slot(&self, name: &str) -> StoreResult<&Slot<'a>> {
        self.slots
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| StoreError::internal(format!("collection '{name}' not locked")))
    }

    fn slot_mut(&mut self, name: &str) -> StoreResult<&mut Slot<'a>> {
        self.slots
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| StoreError::internal(format!("collection '{name}' not locked")))
    }

    pub fn get(&self, collection: &str, id: EntityId) -> StoreResult<Entity> {
        let slot = self.slot(collection)?;
        slot.lookup(id)
            .ok_or_else(|| StoreError::not_found(slot.name(), id))
    }

    /// The entity whose unique `field` equals `value`, if any.
    pub fn find_unique(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Entity>> {
        let slot = self.slot(collection)?;
        if !slot.collection.schema().unique_fields().any(|f| f.name == field) {
            return Err(StoreError::internal(format!(
                "field '{field}' of '{collection}' is not unique"
            )));
        }
        Ok(slot.unique_owner(field, value).and_then(|id| slot.lookup(id)))
    }

    pub fn insert(&mut self, collection: &str, body: &Map<String, Value>) -> StoreResult<Entity> {
        let slot = self.slot_mut(collection)?;
        let fields = slot.collection.schema().validate_create(body)?;
        slot.check_unique(&fields, None)?;

        let id = EntityId::new(slot.next_id);
        slot.next_id += 1;
        let entity = Entity::new(id, fields);
        slot.staged.insert(id, Some(entity.clone()));
        Ok(entity)
    }

    pub fn patch(
        &mut self,
        collection: &str,
        id: EntityId,
        body: &Map<String, Value>,
    ) -> StoreResult<Entity> {
        let slot = self.slot_mut(collection)?;
        let patch = slot.collection.schema().validate_patch(body)?;
        let mut fields = slot
            .lookup(id)
            .map(|e| e.fields)
            .ok_or_else(|| StoreError::not_found(slot.name(), id))?;
        apply_patch(&mut fields, patch);
        slot.check_unique(&fields, Some(id))?;

        let entity = Entity::new(id, fields);
        slot.staged.insert(id, Some(entity.clone()));
        Ok(entity)
    }

    pub fn remove(&mut self, collection: &str, id: EntityId) -> StoreResult<Entity> {
        let slot = self.slot_mut(collection)?;
        let entity = slot
            .lookup(id)
            .ok_or_else(|| StoreError::not_found(slot.name(), id))?;
        slot.staged.insert(id, None);
        Ok(entity)
    }

    /// Apply all staged writes and release the locks.
    pub(super) fn commit(self) {
        for slot in self.slots {
            slot.commit();
        }
    }
}
