//! Product repository.
//!
//! Stock changes are single conditional `UPDATE` statements so concurrent
//! orders for the last units can never drive `stock` below zero.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::ProductId;

use super::{CatalogStore, RepositoryError, StockDecrement, count_from_db, count_to_db};
use crate::models::{NewProduct, Product};

/// Repository for catalog rows.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    category: String,
    old_price: Option<Decimal>,
    price: Decimal,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            category: row.category,
            old_price: row.old_price,
            price: row.price,
            stock: count_from_db(row.stock, "stock")?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CatalogStore for ProductRepository {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, category, old_price, price, stock, is_active,
                   created_at, updated_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, category, old_price, price, stock, is_active,
                   created_at, updated_at
            FROM shop.product
            WHERE id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<StockDecrement, RepositoryError> {
        let amount = count_to_db(amount)?;

        let remaining: Option<(i32,)> = sqlx::query_as(
            r"
            UPDATE shop.product
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((remaining,)) = remaining {
            return Ok(StockDecrement::Decremented {
                remaining: count_from_db(remaining, "stock")?,
            });
        }

        // Nothing matched: either the row is gone or stock was short.
        let available: Option<(i32,)> =
            sqlx::query_as("SELECT stock FROM shop.product WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some((available,)) => Ok(StockDecrement::Insufficient {
                available: count_from_db(available, "stock")?,
            }),
            None => Ok(StockDecrement::NotFound),
        }
    }

    async fn restock(&self, id: ProductId, amount: u32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(count_to_db(amount)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn upsert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (name, category, price, old_price, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO UPDATE
            SET category = EXCLUDED.category,
                price = EXCLUDED.price,
                old_price = EXCLUDED.old_price,
                stock = EXCLUDED.stock,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING id, name, category, old_price, price, stock, is_active,
                      created_at, updated_at
            ",
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.old_price)
        .bind(count_to_db(product.stock)?)
        .bind(product.is_active)
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }
}
