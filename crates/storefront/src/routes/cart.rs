//! Cart route handlers.
//!
//! Carts belong to the signed-in account or, for anonymous shoppers, to the
//! guest ID kept in the session. Every mutation returns the full cart.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::middleware::CartOwnerExt;
use crate::services::CartView;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Reject zero and negative quantities before they reach the cart.
pub(crate) fn positive_quantity(quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Quantity must be at least 1 (got {quantity})")))
}

/// Display the owner's cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().view(&owner).await?))
}

/// Add a product, incrementing the line if it is already in the cart.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let quantity = positive_quantity(body.quantity)?;
    let cart = state.carts().add(&owner, body.product_id, quantity).await?;
    Ok(Json(state.carts().detail(cart).await?))
}

/// Set a line's quantity; 404 if the product is not in the cart.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let quantity = positive_quantity(body.quantity)?;
    let cart = state
        .carts()
        .update_quantity(&owner, product_id, quantity)
        .await?;
    Ok(Json(state.carts().detail(cart).await?))
}

/// Remove a line (succeeds when the line is absent).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>> {
    let cart = state.carts().remove(&owner, product_id).await?;
    Ok(Json(state.carts().detail(cart).await?))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
) -> Result<Json<CartView>> {
    let cart = state.carts().clear(&owner).await?;
    Ok(Json(state.carts().detail(cart).await?))
}
