//! Resource handlers module.
//!
//! Generic CRUD handler shared by every plain collection. Validation is
//! done by the collection's schema; this layer only picks the operation
//! and wraps the result in an [`Outcome`].

use async_trait::async_trait;
use http::Method;
use std::sync::Arc;
use tracing::debug;

use super::definitions::Operation;
use crate::core::dispatch::{ApiResult, Handler, ID_SEGMENT, Outcome, RequestContext};
use crate::domains::store::{Collection, Removal};

impl Operation {
    pub fn method(self) -> Method {
        match self {
            Self::List | Self::Get => Method::GET,
            Self::Create => Method::POST,
            Self::Replace => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    /// Route path for this operation on a collection.
    pub fn path(self, resource: &str) -> String {
        match self {
            Self::List | Self::Create => format!("/{resource}"),
            Self::Get | Self::Replace | Self::Patch | Self::Delete => {
                format!("/{resource}/{ID_SEGMENT}")
            }
        }
    }

    /// Whether the operation changes the collection.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::List | Self::Get)
    }
}

/// Serves one generic operation on one collection.
pub struct CollectionHandler {
    collection: Arc<Collection>,
    operation: Operation,
}

impl CollectionHandler {
    pub fn new(collection: Arc<Collection>, operation: Operation) -> Self {
        Self {
            collection,
            operation,
        }
    }
}

#[async_trait]
impl Handler for CollectionHandler {
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome> {
        let collection = &self.collection;
        debug!(collection = %collection.name(), operation = ?self.operation, "Handling request");
        let outcome = match self.operation {
            Operation::List => Outcome::entities(&collection.list(&ctx.list_filter())),
            Operation::Get => Outcome::entity(&collection.get(ctx.id()?)?),
            Operation::Create => Outcome::created(&collection.create(ctx.json_object()?)?),
            Operation::Replace => {
                Outcome::entity(&collection.replace(ctx.id()?, ctx.json_object()?)?)
            }
            Operation::Patch => Outcome::entity(&collection.patch(ctx.id()?, ctx.json_object()?)?),
            Operation::Delete => {
                let id = ctx.id()?;
                if collection.delete(id)? == Removal::Absent {
                    debug!(%id, "Delete of absent entity treated as success");
                }
                Outcome::Deleted {
                    resource: collection.name().to_string(),
                    id,
                }
            }
        };
        Ok(outcome)
    }
}
