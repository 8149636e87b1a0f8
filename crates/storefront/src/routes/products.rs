//! Product and review route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ProductId;

use super::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::models::{Product, Review};
use crate::services::ReviewSummary;
use crate::state::AppState;

/// Product detail response.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub in_stock: bool,
}

/// Review submission body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Display an active product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductResponse>> {
    let product = state
        .catalog()
        .get_product(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;

    Ok(Json(ProductResponse {
        in_stock: product.in_stock(),
        product,
    }))
}

/// List a product's reviews.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ReviewSummary>> {
    Ok(Json(state.reviews().list(id).await?))
}

/// Submit the caller's review of a product.
#[instrument(skip(state, body))]
pub async fn submit_review(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = state
        .reviews()
        .submit(account, id, body.rating, body.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::super::testing::TestApp;
    use super::*;

    #[tokio::test]
    async fn test_show_product() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        let empty = app.product("Clay Pot", 60, 0).await;
        let hidden = app.product("Old Stock", 10, 4).await;
        app.store.set_active(hidden.id, false).await;

        let (status, body) = app
            .call(Method::GET, &format!("/products/{}", saree.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Silk Saree");
        assert_eq!(body["price"], "400");
        assert_eq!(body["in_stock"], true);

        let (_, body) = app
            .call(Method::GET, &format!("/products/{}", empty.id), None)
            .await;
        assert_eq!(body["in_stock"], false);

        for uri in [format!("/products/{}", hidden.id), "/products/404".to_string()] {
            let (status, _) = app.call(Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (status, _) = app.call(Method::GET, "/products/not-a-number", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reviews() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        let uri = format!("/products/{}/reviews", saree.id);

        let (status, _) = app
            .call(Method::POST, &uri, Some(json!({ "rating": 5 })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.as_account(1);
        let (status, review) = app
            .call(Method::POST, &uri, Some(json!({ "rating": 5, "comment": " Lovely weave " })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(review["comment"], "Lovely weave");

        let (status, _) = app
            .call(Method::POST, &uri, Some(json!({ "rating": 4 })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        app.as_account(2);
        for rating in [0, 6] {
            let (status, _) = app
                .call(Method::POST, &uri, Some(json!({ "rating": rating })))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        app.call(Method::POST, &uri, Some(json!({ "rating": 4 })))
            .await;

        let (status, summary) = app.call(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["count"], 2);
        assert_eq!(summary["average_rating"], "4.5");

        let (status, _) = app
            .call(Method::POST, "/products/999/reviews", Some(json!({ "rating": 3 })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
