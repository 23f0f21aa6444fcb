//! Geographic locations resource definition.

use super::ResourceDefinition;
use crate::domains::store::{FieldKind, FieldSpec, Schema};

/// Named points of interest.
pub struct LocationsResource;

impl ResourceDefinition for LocationsResource {
    const NAME: &'static str = "locations";
    const DESCRIPTION: &'static str = "Named geographic locations";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required("name", FieldKind::String))
            .field(FieldSpec::required("latitude", FieldKind::Number))
            .field(FieldSpec::required("longitude", FieldKind::Number))
            .field(FieldSpec::optional("description", FieldKind::String))
            .search_on("name")
    }
}
