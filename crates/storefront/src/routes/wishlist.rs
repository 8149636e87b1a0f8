//! Wishlist route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::RequireAccount;
use crate::models::WishlistItem;
use crate::state::AppState;

/// Wishlist add body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
) -> Result<Json<Vec<WishlistItem>>> {
    Ok(Json(state.wishlist().list(account).await?))
}

#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    ApiJson(body): ApiJson<WishlistRequest>,
) -> Result<Json<Vec<WishlistItem>>> {
    Ok(Json(state.wishlist().add(account, body.product_id).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<Vec<WishlistItem>>> {
    Ok(Json(state.wishlist().remove(account, product_id).await?))
}
