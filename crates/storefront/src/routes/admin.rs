//! Administrative route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::OrderStatus;

use super::ApiQuery;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// Order listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// All orders, newest first, optionally filtered by status.
#[instrument(skip(state, _admin))]
pub async fn orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(state.orders().list(status).await?))
}
