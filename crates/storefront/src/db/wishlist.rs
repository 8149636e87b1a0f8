//! Wishlist repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{AccountId, ProductId};

use super::{RepositoryError, WishlistStore};
use crate::models::WishlistItem;

/// Repository for `shop.wishlist_item`.
#[derive(Clone)]
pub struct WishlistRepository {
    pool: PgPool,
}

impl WishlistRepository {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    product_id: i32,
    added_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(row: WishlistRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            added_at: row.added_at,
        }
    }
}

#[async_trait]
impl WishlistStore for WishlistRepository {
    async fn list(&self, account: AccountId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT product_id, added_at
            FROM shop.wishlist_item
            WHERE account_id = $1
            ORDER BY added_at DESC, product_id
            ",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WishlistItem::from).collect())
    }

    async fn add(&self, account: AccountId, product: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.wishlist_item (account_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, product_id) DO NOTHING
            ",
        )
        .bind(account)
        .bind(product)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(
        &self,
        account: AccountId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.wishlist_item WHERE account_id = $1 AND product_id = $2")
                .bind(account)
                .bind(product)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
