//! Uploaded files resource definition.
//!
//! Files are uploaded as `multipart/form-data` (field `file`) and stored as
//! a metadata entity carrying the raw bytes as its payload. Metadata is
//! served through the generic list/get/delete routes; the bytes through
//! `GET /files/{id}/content`.

use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{Operation, ResourceDefinition, ResourceOptions};
use crate::core::dispatch::{ApiError, ApiResult, Handler, Outcome, RequestContext, Route};
use crate::core::error::Result;
use crate::domains::store::{Collection, FieldKind, FieldSpec, Schema, Store};

/// Form field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct FilesResource;

impl ResourceDefinition for FilesResource {
    const NAME: &'static str = "files";
    const DESCRIPTION: &'static str = "Uploaded files with downloadable content";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required("filename", FieldKind::String))
            .field(FieldSpec::required("content_type", FieldKind::String))
            .field(FieldSpec::required("size", FieldKind::Integer))
            .field(FieldSpec::required("uploaded_at", FieldKind::String))
            .search_on("filename")
    }

    fn options() -> ResourceOptions {
        ResourceOptions {
            operations: &[Operation::List, Operation::Get, Operation::Delete],
            protected: true,
            ..Default::default()
        }
    }

    fn custom_routes(store: &Arc<Store>) -> Result<Vec<Route>> {
        let collection = store.collection(Self::NAME)?;
        Ok(vec![
            Route::new(
                Method::POST,
                "/files",
                Arc::new(FileUploadHandler::new(collection.clone())),
            ),
            Route::new(
                Method::GET,
                "/files/{id}/content",
                Arc::new(FileDownloadHandler::new(collection)),
            ),
        ])
    }
}

/// Keep only the final path component of a client-supplied file name.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// `POST /files`: store an uploaded file.
pub struct FileUploadHandler {
    collection: Arc<Collection>,
}

impl FileUploadHandler {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl Handler for FileUploadHandler {
    #[instrument(skip_all)]
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome> {
        let part = ctx.upload(UPLOAD_FIELD)?;
        let filename = part
            .file_name
            .as_deref()
            .and_then(sanitize_file_name)
            .ok_or_else(|| ApiError::bad_request("uploaded file has no usable file name"))?;
        let content_type = part
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let mut metadata = Map::new();
        metadata.insert("filename".to_string(), Value::from(filename));
        metadata.insert("content_type".to_string(), Value::from(content_type));
        metadata.insert("size".to_string(), json!(part.data.len()));
        metadata.insert(
            "uploaded_at".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        let entity = self
            .collection
            .create_with_payload(&metadata, Some(part.data.clone()))?;
        info!(id = %entity.id, size = part.data.len(), "File uploaded");
        Ok(Outcome::created(&entity))
    }
}

/// `GET /files/{id}/content`: stream the stored bytes back.
pub struct FileDownloadHandler {
    collection: Arc<Collection>,
}

impl FileDownloadHandler {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl Handler for FileDownloadHandler {
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome> {
        let (entity, data) = self.collection.get_payload(ctx.id()?)?;
        Ok(Outcome::Download {
            content_type: entity
                .get_str("content_type")
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            file_name: entity.get_str("filename").unwrap_or("download").to_string(),
            data,
        })
    }
}
