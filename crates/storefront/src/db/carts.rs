//! Cart repository.
//!
//! A cart row belongs to exactly one owner column (`account_id` or
//! `guest_id`); lines keep their first-added order through `added_at`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{CartOwner, ProductId};

use super::{CartStore, RepositoryError, count_from_db, count_to_db};
use crate::models::{Cart, CartLine};

/// Repository for carts and their lines.
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_cart_id(&self, owner: &CartOwner) -> Result<Option<i32>, RepositoryError> {
        let row: Option<(i32,)> = match owner {
            CartOwner::Account(id) => {
                sqlx::query_as("SELECT id FROM shop.cart WHERE account_id = $1")
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            CartOwner::Guest(id) => {
                sqlx::query_as("SELECT id FROM shop.cart WHERE guest_id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(|(id,)| id))
    }
}

/// Find or create the owner's cart row inside `tx`.
async fn ensure_cart(
    tx: &mut Transaction<'_, Postgres>,
    owner: &CartOwner,
) -> Result<i32, RepositoryError> {
    let (id,): (i32,) = match owner {
        CartOwner::Account(id) => {
            sqlx::query_as(
                r"
                INSERT INTO shop.cart (account_id)
                VALUES ($1)
                ON CONFLICT (account_id) DO UPDATE SET updated_at = NOW()
                RETURNING id
                ",
            )
            .bind(*id)
            .fetch_one(&mut **tx)
            .await?
        }
        CartOwner::Guest(id) => {
            sqlx::query_as(
                r"
                INSERT INTO shop.cart (guest_id)
                VALUES ($1)
                ON CONFLICT (guest_id) DO UPDATE SET updated_at = NOW()
                RETURNING id
                ",
            )
            .bind(id.as_uuid())
            .fetch_one(&mut **tx)
            .await?
        }
    };
    Ok(id)
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity: count_from_db(row.quantity, "cart quantity")?,
        })
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn load(&self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        let Some(cart_id) = self.find_cart_id(owner).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT product_id, quantity
            FROM shop.cart_item
            WHERE cart_id = $1
            ORDER BY added_at, product_id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            owner: *owner,
            items,
        }))
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = ensure_cart(&mut tx, &cart.owner).await?;

        let kept: Vec<i32> = cart.items.iter().map(|l| l.product_id.as_i32()).collect();
        sqlx::query(
            r"
            DELETE FROM shop.cart_item
            WHERE cart_id = $1 AND NOT (product_id = ANY($2))
            ",
        )
        .bind(cart_id)
        .bind(&kept)
        .execute(&mut *tx)
        .await?;

        // Existing lines keep their added_at so the cart's order is stable.
        for line in &cart.items {
            sqlx::query(
                r"
                INSERT INTO shop.cart_item (cart_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = EXCLUDED.quantity
                ",
            )
            .bind(cart_id)
            .bind(line.product_id)
            .bind(count_to_db(line.quantity)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
