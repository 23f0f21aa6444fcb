//! Transport-neutral request types handed to handlers.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::{ApiError, ApiResult};
use crate::domains::store::{EntityId, ListFilter};

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Decoded request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<UploadPart>),
}

/// Everything a handler gets to see.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// The `{id}` path segment, for routes that have one.
    pub path_id: Option<EntityId>,
    pub query: HashMap<String, String>,
    pub body: RequestBody,
}

impl RequestContext {
    /// The `{id}` path parameter.
    pub fn id(&self) -> ApiResult<EntityId> {
        self.path_id
            .ok_or_else(|| ApiError::internal("route has no {id} parameter"))
    }

    /// The body as a JSON object.
    pub fn json_object(&self) -> ApiResult<&Map<String, Value>> {
        match &self.body {
            RequestBody::Json(Value::Object(map)) => Ok(map),
            RequestBody::Json(_) => Err(ApiError::bad_request(
                "request body must be a JSON object",
            )),
            RequestBody::Empty => Err(ApiError::bad_request("request body is required")),
            RequestBody::Multipart(_) => Err(ApiError::bad_request(
                "expected a JSON body, got multipart form data",
            )),
        }
    }

    /// A named part of a multipart body.
    pub fn upload(&self, field: &str) -> ApiResult<&UploadPart> {
        match &self.body {
            RequestBody::Multipart(parts) => parts
                .iter()
                .find(|p| p.field == field)
                .ok_or_else(|| ApiError::bad_request(format!("missing form field '{field}'"))),
            _ => Err(ApiError::bad_request(
                "expected multipart/form-data body",
            )),
        }
    }

    /// List filters from the `q` and `category` query parameters.
    pub fn list_filter(&self) -> ListFilter {
        ListFilter {
            search: self.query.get("q").filter(|q| !q.is_empty()).cloned(),
            category: self.query.get("category").filter(|c| !c.is_empty()).cloned(),
        }
    }
}
