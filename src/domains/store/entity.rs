//! Entity and identifier types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Name of the identifier field every entity carries.
pub const ID_FIELD: &str = "id";

/// Store-assigned entity identifier.
///
/// Identifiers are allocated from a per-collection counter and are never
/// reused, so ordering by id is the same as ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// One record of a collection.
///
/// Serializes as a flat JSON object with `id` first, followed by the
/// entity's declared fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(id: EntityId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Get a field value by name. `id` is served from the identifier.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return Some(Value::from(self.id.get()));
        }
        self.fields.get(field).cloned()
    }

    /// Get an integer field, if present and integral.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    /// Get a string field, if present.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::from(self.id.get()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}
