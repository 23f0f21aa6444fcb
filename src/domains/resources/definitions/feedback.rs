//! Feedback submissions resource definition.

use super::{ResourceDefinition, ResourceOptions};
use crate::domains::store::{FieldKind, FieldSpec, Schema};

/// Visitor feedback. Deletes are idempotent so clients can retry them.
pub struct FeedbackResource;

impl ResourceDefinition for FeedbackResource {
    const NAME: &'static str = "feedback";
    const DESCRIPTION: &'static str = "Feedback messages submitted by users";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required("name", FieldKind::String))
            .field(FieldSpec::required("email", FieldKind::String))
            .field(FieldSpec::required("message", FieldKind::String))
            .field(FieldSpec::optional("rating", FieldKind::Integer))
            .search_on("message")
    }

    fn options() -> ResourceOptions {
        ResourceOptions {
            idempotent_delete: true,
            ..Default::default()
        }
    }
}
