//! Checkout review handler.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use super::ApiQuery;
use crate::error::Result;
use crate::middleware::CartOwnerExt;
use crate::services::{CheckoutSummary, summarize};
use crate::state::AppState;

/// Destination for the summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Destination state/region; unknown or missing regions get the
    /// default fee.
    #[serde(default)]
    pub state: String,
}

/// Summarize the owner's cart against live stock for a destination.
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    CartOwnerExt(owner): CartOwnerExt,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<CheckoutSummary>> {
    let cart = state.carts().view(&owner).await?;
    Ok(Json(summarize(&cart, &query.state)))
}
