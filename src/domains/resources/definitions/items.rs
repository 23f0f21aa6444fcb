//! Inventory items.

use super::ResourceDefinition;
use crate::domains::store::{FieldKind, FieldSpec, Schema};

/// Products with a stock level, searchable by name and filterable by
/// category. Stock is also decremented by the cart.
pub struct ItemsResource;

impl ResourceDefinition for ItemsResource {
    const NAME: &'static str = "items";
    const DESCRIPTION: &'static str = "Inventory items with stock levels";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required("name", FieldKind::String))
            .field(FieldSpec::required("stock", FieldKind::Integer))
            .field(FieldSpec::optional("price", FieldKind::Number))
            .field(FieldSpec::optional("category", FieldKind::String))
            .search_on("name")
            .category_on("category")
    }
}
