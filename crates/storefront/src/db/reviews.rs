//! Review repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{AccountId, ProductId, ReviewId};

use super::{RepositoryError, ReviewStore, conflict_on_unique};
use crate::models::{NewReview, Review};

/// Repository for `shop.review`.
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    account_id: i32,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {}", row.rating))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            account_id: AccountId::new(row.account_id),
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ReviewStore for ReviewRepository {
    async fn list_for_product(&self, product: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, account_id, rating, comment, created_at
            FROM shop.review
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO shop.review (product_id, account_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, account_id, rating, comment, created_at
            ",
        )
        .bind(review.product_id)
        .bind(review.account_id)
        .bind(i16::from(review.rating))
        .bind(review.comment.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "you have already reviewed this product"))?;

        Review::try_from(row)
    }
}
