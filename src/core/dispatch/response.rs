//! Successful handler outcomes.

use bytes::Bytes;
use http::StatusCode;
use serde_json::{Value, json};

use crate::domains::store::{Entity, EntityId};

/// What a handler produced. The dispatcher turns it into a status code and
/// body; handlers never pick status codes themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A read, update or action result.
    Ok(Value),
    /// A newly created entity.
    Created(Value),
    /// A delete confirmation.
    Deleted { resource: String, id: EntityId },
    /// Raw bytes for download.
    Download {
        content_type: String,
        file_name: String,
        data: Bytes,
    },
}

impl Outcome {
    pub fn entity(entity: &Entity) -> Self {
        Self::Ok(entity.to_json())
    }

    pub fn created(entity: &Entity) -> Self {
        Self::Created(entity.to_json())
    }

    pub fn entities(entities: &[Entity]) -> Self {
        Self::Ok(Value::Array(entities.iter().map(Entity::to_json).collect()))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Created(_) => StatusCode::CREATED,
            Self::Ok(_) | Self::Deleted { .. } | Self::Download { .. } => StatusCode::OK,
        }
    }

    /// JSON body for the non-download outcomes.
    pub fn json_body(&self) -> Option<Value> {
        match self {
            Self::Ok(value) | Self::Created(value) => Some(value.clone()),
            Self::Deleted { resource, id } => Some(json!({
                "message": format!("{resource} {id} deleted"),
                "id": id.get(),
            })),
            Self::Download { .. } => None,
        }
    }
}
