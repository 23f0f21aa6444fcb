//! A single named collection of entities.
//!
//! All state sits behind one `RwLock`. Every mutating operation validates
//! the request and checks unique constraints first and only then touches
//! the data, so readers never see a half-applied write.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::entity::{Entity, EntityId};
use super::error::{StoreError, StoreResult};
use super::schema::{FieldChange, ListFilter, Patch, Schema};

/// Outcome of a delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// The entity existed and was removed.
    Removed(Entity),
    /// The entity did not exist and the collection tolerates that.
    Absent,
}

/// A stored entity with its optional binary payload.
#[derive(Debug, Clone)]
pub(super) struct Record {
    pub(super) entity: Entity,
    pub(super) payload: Option<Bytes>,
}

/// Lock-protected state of a collection.
#[derive(Debug)]
pub(super) struct CollectionData {
    pub(super) entries: BTreeMap<EntityId, Record>,
    /// Next id to hand out. Only ever grows.
    pub(super) next_id: u64,
    /// Unique field name -> rendered value -> owning entity.
    unique_index: HashMap<&'static str, HashMap<String, EntityId>>,
}

impl CollectionData {
    fn new(schema: &Schema) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            unique_index: schema
                .unique_fields()
                .map(|f| (f.name, HashMap::new()))
                .collect(),
        }
    }

    /// Fail if any unique field in `fields` is already owned by another
    /// entity.
    pub(super) fn check_unique(
        &self,
        fields: &Map<String, Value>,
        exclude: Option<EntityId>,
    ) -> StoreResult<()> {
        for (field, index) in &self.unique_index {
            let Some(value) = fields.get(*field) else {
                continue;
            };
            match index.get(&index_key(value)) {
                Some(owner) if Some(*owner) != exclude => {
                    return Err(StoreError::conflict(format!(
                        "{field} {value} already exists"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Owner of a unique field value, or `None` if the value is free or the
    /// field is not unique.
    pub(super) fn unique_owner(&self, field: &str, value: &Value) -> Option<EntityId> {
        self.unique_index.get(field)?.get(&index_key(value)).copied()
    }

    pub(super) fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert or replace an entity, keeping any existing payload unless a
    /// new one is given.
    pub(super) fn put(&mut self, entity: Entity, payload: Option<Bytes>) {
        let id = entity.id;
        if let Some(previous) = self.entries.remove(&id) {
            self.unindex(&previous.entity);
            let payload = payload.or(previous.payload);
            self.index(&entity);
            self.entries.insert(id, Record { entity, payload });
        } else {
            self.index(&entity);
            self.entries.insert(id, Record { entity, payload });
        }
    }

    pub(super) fn remove(&mut self, id: EntityId) -> Option<Record> {
        let record = self.entries.remove(&id)?;
        self.unindex(&record.entity);
        Some(record)
    }

    fn index(&mut self, entity: &Entity) {
        for (field, index) in self.unique_index.iter_mut() {
            if let Some(value) = entity.fields.get(*field) {
                index.insert(index_key(value), entity.id);
            }
        }
    }

    fn unindex(&mut self, entity: &Entity) {
        for (field, index) in self.unique_index.iter_mut() {
            if let Some(value) = entity.fields.get(*field) {
                let key = index_key(value);
                // The value may already belong to an entity committed earlier.
                if index.get(&key) == Some(&entity.id) {
                    index.remove(&key);
                }
            }
        }
    }
}

fn index_key(value: &Value) -> String {
    value.to_string()
}

/// Apply a validated patch to a field map.
pub(super) fn apply_patch(fields: &mut Map<String, Value>, patch: Patch) {
    for (name, change) in patch {
        match change {
            FieldChange::Set(value) => {
                fields.insert(name, value);
            }
            FieldChange::Clear => {
                fields.remove(&name);
            }
        }
    }
}

/// A named, schema-checked collection of entities.
#[derive(Debug)]
pub struct Collection {
    name: String,
    schema: Schema,
    idempotent_delete: bool,
    /// Position in the store's global lock order.
    rank: usize,
    data: RwLock<CollectionData>,
}

impl Collection {
    pub(super) fn new(
        name: impl Into<String>,
        schema: Schema,
        idempotent_delete: bool,
        rank: usize,
    ) -> Self {
        let data = RwLock::new(CollectionData::new(&schema));
        Self {
            name: name.into(),
            schema,
            idempotent_delete,
            rank,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn idempotent_delete(&self) -> bool {
        self.idempotent_delete
    }

    pub(super) fn rank(&self) -> usize {
        self.rank
    }

    // Writers validate before mutating and commits cannot fail, so the data
    // behind a poisoned lock is still consistent.
    pub(super) fn read(&self) -> RwLockReadGuard<'_, CollectionData> {
        self.data.read().unwrap_or_else(|poisoned| {
            warn!(collection = %self.name, "Recovering poisoned collection lock");
            self.data.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    pub(super) fn write(&self) -> RwLockWriteGuard<'_, CollectionData> {
        self.data.write().unwrap_or_else(|poisoned| {
            warn!(collection = %self.name, "Recovering poisoned collection lock");
            self.data.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    /// List entities in insertion order, applying the schema's filters.
    pub fn list(&self, filter: &ListFilter) -> Vec<Entity> {
        self.read()
            .entries
            .values()
            .map(|record| &record.entity)
            .filter(|entity| self.schema.matches(entity, filter))
            .cloned()
            .collect()
    }

    /// Number of entities currently stored.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: EntityId) -> StoreResult<Entity> {
        let data = self.read();
        data.entries
            .get(&id)
            .map(|record| record.entity.clone())
            .ok_or_else(|| StoreError::not_found(&self.name, id))
    }

    /// Get an entity together with its binary payload.
    pub fn get_payload(&self, id: EntityId) -> StoreResult<(Entity, Bytes)> {
        let data = self.read();
        let record = data
            .entries
            .get(&id)
            .ok_or_else(|| StoreError::not_found(&self.name, id))?;
        let payload = record.payload.clone().unwrap_or_default();
        Ok((record.entity.clone(), payload))
    }

    /// Validate and insert a new entity.
    pub fn create(&self, body: &Map<String, Value>) -> StoreResult<Entity> {
        self.create_with_payload(body, None)
    }

    /// Validate and insert a new entity carrying a binary payload.
    pub fn create_with_payload(
        &self,
        body: &Map<String, Value>,
        payload: Option<Bytes>,
    ) -> StoreResult<Entity> {
        let fields = self.schema.validate_create(body)?;

        let mut data = self.write();
        data.check_unique(&fields, None)?;
        let id = data.allocate_id();
        let entity = Entity::new(id, fields);
        data.put(entity.clone(), payload);

        debug!(collection = %self.name, %id, "Entity created");
        Ok(entity)
    }

    /// Replace every field of an existing entity.
    pub fn replace(&self, id: EntityId, body: &Map<String, Value>) -> StoreResult<Entity> {
        let fields = self.schema.validate_replace(body)?;

        let mut data = self.write();
        if !data.entries.contains_key(&id) {
            return Err(StoreError::not_found(&self.name, id));
        }
        data.check_unique(&fields, Some(id))?;
        let entity = Entity::new(id, fields);
        data.put(entity.clone(), None);

        debug!(collection = %self.name, %id, "Entity replaced");
        Ok(entity)
    }

    /// Merge the provided fields into an existing entity.
    pub fn patch(&self, id: EntityId, body: &Map<String, Value>) -> StoreResult<Entity> {
        let patch = self.schema.validate_patch(body)?;

        let mut data = self.write();
        let mut fields = data
            .entries
            .get(&id)
            .map(|record| record.entity.fields.clone())
            .ok_or_else(|| StoreError::not_found(&self.name, id))?;
        apply_patch(&mut fields, patch);
        data.check_unique(&fields, Some(id))?;
        let entity = Entity::new(id, fields);
        data.put(entity.clone(), None);

        debug!(collection = %self.name, %id, "Entity patched");
        Ok(entity)
    }

    /// Remove an entity. Absent ids are an error unless the collection
    /// declares idempotent delete.
    pub fn delete(&self, id: EntityId) -> StoreResult<Removal> {
        let mut data = self.write();
        match data.remove(id) {
            Some(record) => {
                debug!(collection = %self.name, %id, "Entity deleted");
                Ok(Removal::Removed(record.entity))
            }
            None if self.idempotent_delete => Ok(Removal::Absent),
            None => Err(StoreError::not_found(&self.name, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::store::schema::{FieldKind, FieldSpec};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn items() -> Collection {
        let schema = Schema::new()
            .field(FieldSpec::required("name", FieldKind::String))
            .field(FieldSpec::required("stock", FieldKind::Integer))
            .field(FieldSpec::optional("category", FieldKind::String))
            .search_on("name");
        Collection::new("items", schema, false, 0)
    }

    fn users() -> Collection {
        let schema = Schema::new()
            .field(FieldSpec::required("username", FieldKind::String).unique())
            .field(FieldSpec::required("email", FieldKind::String));
        Collection::new("users", schema, false, 0)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let items = items();
        let body = object(json!({"name": "Widget", "stock": 5}));

        let first = items.create(&body).unwrap();
        let second = items.create(&body).unwrap();
        assert_eq!(first.id, EntityId::new(1));
        assert_eq!(second.id, EntityId::new(2));
        assert_eq!(first.fields, second.fields);
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let items = items();
        let body = object(json!({"name": "Widget", "stock": 5}));

        let first = items.create(&body).unwrap();
        let second = items.create(&body).unwrap();
        items.delete(second.id).unwrap();
        items.delete(first.id).unwrap();

        let third = items.create(&body).unwrap();
        assert_eq!(third.id, EntityId::new(3));
        assert!(matches!(items.get(first.id), Err(StoreError::NotFound { .. })));
        assert!(matches!(items.get(second.id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_failed_create_does_not_mutate() {
        let items = items();
        items
            .create(&object(json!({"name": "Widget", "stock": 5})))
            .unwrap();

        let err = items.create(&object(json!({"name": "", "stock": 5})));
        assert!(matches!(err, Err(StoreError::InvalidInput(_))));
        assert_eq!(items.len(), 1);

        // A rejected create must not burn an id either.
        let next = items
            .create(&object(json!({"name": "Gadget", "stock": 1})))
            .unwrap();
        assert_eq!(next.id, EntityId::new(2));
    }

    #[test]
    fn test_list_preserves_insertion_order_and_filters() {
        let items = items();
        for name in ["Widget", "Gadget", "Blue widget"] {
            items
                .create(&object(json!({"name": name, "stock": 1})))
                .unwrap();
        }

        let all = items.list(&ListFilter::default());
        let names: Vec<_> = all.iter().map(|e| e.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["Widget", "Gadget", "Blue widget"]);
        assert_eq!(all, items.list(&ListFilter::default()));

        let filtered = items
            .list(&ListFilter {
                search: Some("WIDGET".to_string()),
                category: None,
            });
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_replace_and_patch() {
        let items = items();
        let created = items
            .create(&object(json!({"name": "Widget", "stock": 5, "category": "tools"})))
            .unwrap();

        let patched = items
            .patch(created.id, &object(json!({"stock": 4})))
            .unwrap();
        assert_eq!(patched.get_i64("stock"), Some(4));
        assert_eq!(patched.get_str("category"), Some("tools"));

        let replaced = items
            .replace(
                created.id,
                &object(json!({"name": "Gizmo", "stock": 1, "category": null})),
            )
            .unwrap();
        assert_eq!(replaced.get_str("name"), Some("Gizmo"));
        assert_eq!(replaced.get_str("category"), None);
        assert_eq!(items.get(created.id).unwrap(), replaced);
    }

    #[test]
    fn test_update_missing_entity_is_not_found() {
        let items = items();
        let err = items.patch(EntityId::new(9), &object(json!({"stock": 1})));
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_delete_missing_entity() {
        let strict = items();
        assert!(matches!(
            strict.delete(EntityId::new(1)),
            Err(StoreError::NotFound { .. })
        ));

        let lenient = Collection::new("feedback", Schema::new(), true, 0);
        assert_eq!(lenient.delete(EntityId::new(1)).unwrap(), Removal::Absent);
    }

    #[test]
    fn test_unique_fields_conflict() {
        let users = users();
        let alice = users
            .create(&object(json!({"username": "alice", "email": "a@example.com"})))
            .unwrap();

        let err = users.create(&object(json!({"username": "alice", "email": "b@example.com"})));
        assert!(matches!(err, Err(StoreError::Conflict(_))));

        // Updating an entity with its own unique value is fine.
        users
            .patch(alice.id, &object(json!({"username": "alice"})))
            .unwrap();

        // Deleting frees the value.
        users.delete(alice.id).unwrap();
        users
            .create(&object(json!({"username": "alice", "email": "c@example.com"})))
            .unwrap();
    }

    #[test]
    fn test_payload_round_trip() {
        let files = Collection::new("files", Schema::new(), false, 0);
        let entity = files
            .create_with_payload(&Map::new(), Some(Bytes::from_static(b"hello")))
            .unwrap();
        let (_, payload) = files.get_payload(entity.id).unwrap();
        assert_eq!(payload, Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let items = Arc::new(items());
        items
            .create(&object(json!({"name": "Widget", "stock": 5})))
            .unwrap();

        let writer = items.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = writer.write();
            panic!("writer crashed while holding the lock");
        })
        .join();
        assert!(crashed.is_err());

        assert_eq!(items.get(EntityId::new(1)).unwrap().get_i64("stock"), Some(5));
        let next = items
            .create(&object(json!({"name": "Gadget", "stock": 1})))
            .unwrap();
        assert_eq!(next.id, EntityId::new(2));
        assert_eq!(items.len(), 2);
        assert!(!items.data.is_poisoned());
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        let items = Arc::new(items());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let items = items.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            items
                                .create(&object(json!({"name": "Widget", "stock": 1})))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(items.len(), 400);
    }
}
