//! Order repository.
//!
//! The header row and its lines are written in one transaction; after that
//! only `status`, `is_paid` and `updated_at` are ever updated.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{
    AccountId, OrderCode, OrderId, OrderStatus, PaymentMethod, Phone, Pincode, ProductId,
};

use super::{OrderStore, RepositoryError, conflict_on_unique, count_from_db, count_to_db};
use crate::models::{NewOrder, Order, OrderLine, OrderUpdate, ShippingAddress};

macro_rules! order_columns {
    () => {
        r"id, code, account_id, full_name, phone, address, city, state, pincode,
          subtotal, shipping_fee, total, payment_method, is_paid, status,
          created_at, updated_at"
    };
}

/// Repository for orders and their lines.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach lines to header rows, preserving the header order.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, product_name, quantity, price
            FROM shop.order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            lines
                .entry(order_id)
                .or_default()
                .push(OrderLine::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let items = lines.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    code: String,
    account_id: i32,
    full_name: String,
    phone: String,
    address: String,
    city: String,
    state: String,
    pincode: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    payment_method: PaymentMethod,
    is_paid: bool,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let phone = Phone::parse(&self.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;
        let pincode = Pincode::parse(&self.pincode).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid pincode in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            code: OrderCode::from_stored(self.code),
            account_id: AccountId::new(self.account_id),
            items,
            shipping_address: ShippingAddress {
                full_name: self.full_name,
                phone,
                address: self.address,
                city: self.city,
                state: self.state,
                pincode,
            },
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            total: self.total,
            payment_method: self.payment_method,
            is_paid: self.is_paid,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: count_from_db(row.quantity, "order quantity")?,
            price: row.price,
        })
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = &order.shipping_address;

        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r#"
            INSERT INTO shop."order" (
                code, account_id, full_name, phone, address, city, state, pincode,
                subtotal, shipping_fee, total, payment_method, is_paid, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'Pending')
            RETURNING "#,
            order_columns!()
        ))
        .bind(order.code.as_str())
        .bind(order.account_id)
        .bind(&address.full_name)
        .bind(address.phone.as_str())
        .bind(&address.address)
        .bind(&address.city)
        .bind(&address.state)
        .bind(address.pincode.as_str())
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.total)
        .bind(order.payment_method)
        .bind(order.is_paid)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order code already issued"))?;

        let mut items = Vec::with_capacity(order.items.len());
        for (position, line) in (0_i32..).zip(&order.items) {
            let stored = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO shop.order_item
                    (order_id, position, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING order_id, product_id, product_name, quantity, price
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(count_to_db(line.quantity)?)
            .bind(line.price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderLine::try_from(stored)?);
        }

        tx.commit().await?;
        // Lines as stored, so the response matches every later read.
        row.into_order(items)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            r#" FROM shop."order" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            r#" FROM shop."order"
                WHERE account_id = $1
                ORDER BY created_at DESC, id DESC"#
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            r#" FROM shop."order"
                WHERE $1::shop.order_status IS NULL OR status = $1
                ORDER BY created_at DESC, id DESC"#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn update(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r#"
            UPDATE shop."order"
            SET status = COALESCE($3, status),
                is_paid = COALESCE($4, is_paid),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING "#,
            order_columns!()
        ))
        .bind(id)
        .bind(expected)
        .bind(update.status)
        .bind(update.is_paid)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}
