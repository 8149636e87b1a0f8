//! Review service.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use bazaar_core::{AccountId, ProductId};

use crate::db::{CatalogStore, RepositoryError, ReviewStore, Stores};
use crate::models::review::{MAX_RATING, MIN_RATING};
use crate::models::{NewReview, Review};

/// Longest accepted review comment, in characters.
const MAX_COMMENT_CHARS: usize = 2_000;

/// Errors that can occur during review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Rating outside the star range, or an oversized comment.
    #[error("{0}")]
    Validation(String),

    /// The product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The account already reviewed this product.
    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A product's reviews with their average rating.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub product_id: ProductId,
    pub count: usize,
    /// Mean rating rounded to one decimal place; `None` without reviews.
    pub average_rating: Option<Decimal>,
    pub reviews: Vec<Review>,
}

/// Product reviews.
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl ReviewService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            reviews: Arc::clone(&stores.reviews),
            catalog: Arc::clone(&stores.catalog),
        }
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ProductNotFound` for unknown products.
    pub async fn list(&self, product_id: ProductId) -> Result<ReviewSummary, ReviewError> {
        if self.catalog.get_product(product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound(product_id));
        }
        let reviews = self.reviews.list_for_product(product_id).await?;
        Ok(ReviewSummary {
            product_id,
            count: reviews.len(),
            average_rating: average(&reviews),
            reviews,
        })
    }

    /// Submit a review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` for a rating outside 1-5,
    /// `ReviewError::ProductNotFound` for unknown products, and
    /// `ReviewError::AlreadyReviewed` for a second review by one account.
    #[instrument(skip(self, comment))]
    pub async fn submit(
        &self,
        account: AccountId,
        product_id: ProductId,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review, ReviewError> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| {
                ReviewError::Validation(format!(
                    "Rating must be between {MIN_RATING} and {MAX_RATING}"
                ))
            })?;
        let comment = comment
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        if comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS)
        {
            return Err(ReviewError::Validation(format!(
                "Comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }
        if self.catalog.get_product(product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound(product_id));
        }

        let review = self
            .reviews
            .insert(&NewReview {
                product_id,
                account_id: account,
                rating,
                comment,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ReviewError::AlreadyReviewed,
                other => ReviewError::Repository(other),
            })?;

        info!(review_id = %review.id, rating, "Review submitted");
        Ok(review)
    }
}

fn average(reviews: &[Review]) -> Option<Decimal> {
    if reviews.is_empty() {
        return None;
    }
    let total: Decimal = reviews.iter().map(|r| Decimal::from(r.rating)).sum();
    Some((total / Decimal::from(reviews.len())).round_dp(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::MemoryStore;

    use super::*;

    async fn setup() -> (ReviewService, ProductId) {
        let store = Arc::new(MemoryStore::new());
        let product = store.insert_product("Cotton Towel", Decimal::from(150), 20).await;
        (ReviewService::new(&Stores::in_memory(&store)), product.id)
    }

    #[tokio::test]
    async fn test_rating_range() {
        let (service, product) = setup().await;
        for rating in [0, 6, -1, 300] {
            assert!(matches!(
                service.submit(AccountId::new(1), product, rating, None).await,
                Err(ReviewError::Validation(_))
            ));
        }
        service.submit(AccountId::new(1), product, 5, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_review_per_account() {
        let (service, product) = setup().await;
        service
            .submit(AccountId::new(1), product, 4, Some("Soft".to_owned()))
            .await
            .unwrap();
        assert!(matches!(
            service.submit(AccountId::new(1), product, 2, None).await,
            Err(ReviewError::AlreadyReviewed)
        ));
    }

    #[tokio::test]
    async fn test_summary_average_and_order() {
        let (service, product) = setup().await;
        service.submit(AccountId::new(1), product, 4, None).await.unwrap();
        service.submit(AccountId::new(2), product, 5, None).await.unwrap();
        service.submit(AccountId::new(3), product, 5, None).await.unwrap();

        let summary = service.list(product).await.unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_rating, Some(Decimal::new(47, 1)));
        assert_eq!(summary.reviews.first().unwrap().account_id, AccountId::new(3));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.list(ProductId::new(77)).await,
            Err(ReviewError::ProductNotFound(_))
        ));
    }
}
