//! Declared resource schemas and the shared validation routine.
//!
//! Every collection is created with a [`Schema`] listing its fields, their
//! types and flags. Handlers never check fields themselves; they pass the
//! raw JSON object to one of the `validate_*` methods here and get back
//! either a clean field map or an [`StoreError::InvalidInput`].

use serde::Serialize;
use serde_json::{Map, Value};

use super::entity::{Entity, ID_FIELD};
use super::error::{StoreError, StoreResult};

/// The JSON type a field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            // Stored integers must fit in an i64.
            Self::Integer => value.is_i64(),
            Self::Number => value.is_number(),
        }
    }

    fn article(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            unique: false,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
        }
    }

    /// Mark the field as unique within its collection.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A field change produced by a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Set(Value),
    Clear,
}

/// Validated partial update, in declaration order.
pub type Patch = Vec<(String, FieldChange)>;

/// Schema of a resource collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
    /// Field matched by the `q` substring filter when listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_field: Option<&'static str>,
    /// Field matched by the `category` filter when listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_field: Option<&'static str>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn search_on(mut self, field: &'static str) -> Self {
        self.search_field = Some(field);
        self
    }

    pub fn category_on(mut self, field: &'static str) -> Self {
        self.category_field = Some(field);
        self
    }

    /// Fields declared unique.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Validate a create payload.
    ///
    /// Required fields must be present and non-empty, present fields must
    /// have the declared type. `null` optional fields are dropped.
    pub fn validate_create(&self, body: &Map<String, Value>) -> StoreResult<Map<String, Value>> {
        self.reject_foreign_keys(body)?;

        let mut clean = Map::new();
        for spec in &self.fields {
            match body.get(spec.name) {
                None if spec.required => {
                    return Err(StoreError::invalid_input(format!(
                        "missing required field '{}'",
                        spec.name
                    )));
                }
                None => {}
                Some(value) => {
                    if let Some(value) = check_value(spec, value)? {
                        clean.insert(spec.name.to_string(), value);
                    }
                }
            }
        }
        Ok(clean)
    }

    /// Validate a full replacement payload.
    ///
    /// Every declared field must be present. Optional fields may be `null`.
    pub fn validate_replace(&self, body: &Map<String, Value>) -> StoreResult<Map<String, Value>> {
        if let Some(missing) = self.fields.iter().find(|f| !body.contains_key(f.name)) {
            return Err(StoreError::invalid_input(format!(
                "full update requires field '{}'",
                missing.name
            )));
        }
        self.validate_create(body)
    }

    /// Validate a partial update payload.
    pub fn validate_patch(&self, body: &Map<String, Value>) -> StoreResult<Patch> {
        self.reject_foreign_keys(body)?;

        let mut patch = Vec::new();
        for spec in &self.fields {
            let Some(value) = body.get(spec.name) else {
                continue;
            };
            let change = match check_value(spec, value)? {
                Some(value) => FieldChange::Set(value),
                None => FieldChange::Clear,
            };
            patch.push((spec.name.to_string(), change));
        }
        Ok(patch)
    }

    /// Check whether an entity passes the list filters.
    pub fn matches(&self, entity: &Entity, filter: &ListFilter) -> bool {
        if let (Some(field), Some(needle)) = (self.search_field, filter.search.as_deref()) {
            let needle = needle.to_lowercase();
            let hit = entity
                .get_str(field)
                .is_some_and(|value| value.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let (Some(field), Some(category)) = (self.category_field, filter.category.as_deref()) {
            if entity.get_str(field) != Some(category) {
                return false;
            }
        }
        true
    }

    fn reject_foreign_keys(&self, body: &Map<String, Value>) -> StoreResult<()> {
        if body.contains_key(ID_FIELD) {
            return Err(StoreError::invalid_input(
                "field 'id' is assigned by the server",
            ));
        }
        if let Some(unknown) = body
            .keys()
            .find(|key| !self.fields.iter().any(|f| f.name == key.as_str()))
        {
            return Err(StoreError::invalid_input(format!("unknown field '{unknown}'")));
        }
        Ok(())
    }
}

/// Validate a single value against its spec. `Ok(None)` means an optional
/// field set to `null`.
fn check_value(spec: &FieldSpec, value: &Value) -> StoreResult<Option<Value>> {
    if is_empty(value) {
        if spec.required {
            return Err(StoreError::invalid_input(format!(
                "field '{}' must not be empty",
                spec.name
            )));
        }
        if value.is_null() {
            return Ok(None);
        }
    }
    if !spec.kind.accepts(value) {
        return Err(StoreError::invalid_input(format!(
            "field '{}' must be {}",
            spec.name,
            spec.kind.article()
        )));
    }
    Ok(Some(value.clone()))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Filters accepted by list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}
