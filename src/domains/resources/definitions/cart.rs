//! Shopping cart resource definition.
//!
//! The cart is not written through the generic CRUD routes. Adding a line
//! moves stock out of `items` and removing a line moves it back, both inside
//! a single store transaction over `items` and `cart`.

use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::items::ItemsResource;
use super::{Operation, ResourceDefinition, ResourceOptions};
use crate::core::dispatch::{ApiError, ApiResult, Handler, Outcome, RequestContext, Route};
use crate::core::error::Result;
use crate::domains::store::{
    Entity, EntityId, FieldKind, FieldSpec, Schema, Store, StoreError, StoreResult,
};

const PRODUCT_ID: &str = "product_id";
const QUANTITY: &str = "quantity";
const STOCK: &str = "stock";

pub struct CartResource;

impl ResourceDefinition for CartResource {
    const NAME: &'static str = "cart";
    const DESCRIPTION: &'static str = "Cart lines reserving stock from items";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required(PRODUCT_ID, FieldKind::Integer).unique())
            .field(FieldSpec::required(QUANTITY, FieldKind::Integer))
    }

    fn options() -> ResourceOptions {
        ResourceOptions {
            operations: &[Operation::List, Operation::Get],
            ..Default::default()
        }
    }

    fn custom_routes(store: &Arc<Store>) -> Result<Vec<Route>> {
        Ok(vec![
            Route::new(
                Method::POST,
                "/cart/add",
                Arc::new(CartAddHandler::new(store.clone())),
            ),
            Route::new(
                Method::DELETE,
                "/cart/{id}",
                Arc::new(CartRemoveHandler::new(store.clone())),
            ),
        ])
    }
}

fn object(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// An integer field every stored entity of the collection must carry.
fn stored_int(entity: &Entity, field: &str) -> StoreResult<i64> {
    entity.get_i64(field).ok_or_else(|| {
        StoreError::internal(format!("entity {} has no integer '{field}'", entity.id))
    })
}

/// `POST /cart/add`: reserve stock and add it to the cart.
pub struct CartAddHandler {
    store: Arc<Store>,
}

impl CartAddHandler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn parse(body: &Map<String, Value>) -> ApiResult<(EntityId, i64)> {
        if let Some(unknown) = body.keys().find(|k| *k != PRODUCT_ID && *k != QUANTITY) {
            return Err(ApiError::bad_request(format!("unknown field '{unknown}'")));
        }
        let product_id = match body.get(PRODUCT_ID) {
            None | Some(Value::Null) => {
                return Err(ApiError::bad_request("missing required field 'product_id'"));
            }
            Some(value) => value.as_u64().map(EntityId::new).ok_or_else(|| {
                ApiError::bad_request("field 'product_id' must be a non-negative integer")
            })?,
        };
        let quantity = match body.get(QUANTITY) {
            None | Some(Value::Null) => {
                return Err(ApiError::bad_request("missing required field 'quantity'"));
            }
            Some(value) => value.as_i64().filter(|q| *q > 0).ok_or_else(|| {
                ApiError::bad_request("field 'quantity' must be a positive integer")
            })?,
        };
        Ok((product_id, quantity))
    }

    /// Decrement stock and upsert the cart line, all or nothing.
    pub fn add(&self, product_id: EntityId, quantity: i64) -> StoreResult<(Entity, Entity)> {
        self.store
            .transaction(&[ItemsResource::NAME, CartResource::NAME], |tx| {
                let product = tx.get(ItemsResource::NAME, product_id)?;
                let stock = stored_int(&product, STOCK)?;
                let remaining = stock
                    .checked_sub(quantity)
                    .filter(|remaining| *remaining >= 0)
                    .ok_or_else(|| {
                        StoreError::invalid_input(format!(
                            "insufficient stock for product {product_id}: \
                             requested {quantity}, available {stock}"
                        ))
                    })?;
                let product = tx.patch(
                    ItemsResource::NAME,
                    product_id,
                    &object(&[(STOCK, json!(remaining))]),
                )?;

                let product_key = json!(product_id.get());
                let line = match tx.find_unique(CartResource::NAME, PRODUCT_ID, &product_key)? {
                    Some(line) => {
                        let total = stored_int(&line, QUANTITY)?
                            .checked_add(quantity)
                            .ok_or_else(|| {
                                StoreError::invalid_input(format!(
                                    "cart quantity for product {product_id} is too large"
                                ))
                            })?;
                        tx.patch(
                            CartResource::NAME,
                            line.id,
                            &object(&[(QUANTITY, json!(total))]),
                        )?
                    }
                    None => tx.insert(
                        CartResource::NAME,
                        &object(&[(PRODUCT_ID, product_key), (QUANTITY, json!(quantity))]),
                    )?,
                };
                Ok((line, product))
            })
    }
}

#[async_trait]
impl Handler for CartAddHandler {
    #[instrument(skip_all)]
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome> {
        let (product_id, quantity) = Self::parse(ctx.json_object()?)?;
        let (line, product) = self.add(product_id, quantity)?;
        info!(%product_id, quantity, cart_line = %line.id, "Added to cart");

        Ok(Outcome::Ok(json!({
            "cart_item": line.to_json(),
            "product": product.to_json(),
        })))
    }
}

/// `DELETE /cart/{id}`: drop a cart line and return its stock.
pub struct CartRemoveHandler {
    store: Arc<Store>,
}

impl CartRemoveHandler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn remove(&self, id: EntityId) -> StoreResult<Entity> {
        self.store
            .transaction(&[ItemsResource::NAME, CartResource::NAME], |tx| {
                let line = tx.remove(CartResource::NAME, id)?;
                let quantity = stored_int(&line, QUANTITY)?;
                let product_id = line
                    .get(PRODUCT_ID)
                    .and_then(|v| v.as_u64())
                    .map(EntityId::new)
                    .ok_or_else(|| {
                        StoreError::internal(format!("cart line {id} has no product id"))
                    })?;

                // The product may have been deleted since; then the stock is gone too.
                let product = match tx.get(ItemsResource::NAME, product_id) {
                    Ok(product) => product,
                    Err(StoreError::NotFound { .. }) => return Ok(line),
                    Err(e) => return Err(e),
                };
                let restocked = stored_int(&product, STOCK)?
                    .checked_add(quantity)
                    .ok_or_else(|| {
                        StoreError::invalid_input(format!(
                            "returning {quantity} to product {product_id} overflows its stock"
                        ))
                    })?;
                tx.patch(
                    ItemsResource::NAME,
                    product_id,
                    &object(&[(STOCK, json!(restocked))]),
                )?;
                Ok(line)
            })
    }
}

#[async_trait]
impl Handler for CartRemoveHandler {
    #[instrument(skip_all)]
    async fn handle(&self, ctx: RequestContext) -> ApiResult<Outcome> {
        let id = ctx.id()?;
        self.remove(id)?;
        info!(cart_line = %id, "Removed from cart");

        Ok(Outcome::Deleted {
            resource: CartResource::NAME.to_string(),
            id,
        })
    }
}
