//! Storage for the storefront.
//!
//! # Database: `bazaar` (schema `shop`)
//!
//! ## Tables
//!
//! - `product` - Catalog rows with the contended `stock` counter
//! - `cart` / `cart_item` - One cart per owner (account XOR guest)
//! - `counter` - Named sequences (`order` issues order codes)
//! - `order` / `order_item` - Placed orders with snapshotted lines
//! - `wishlist_item` - Saved products per account
//! - `review` - Product reviews, one per account per product
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Backends
//!
//! Every table family sits behind a trait so services can run against
//! `PostgreSQL` in production and [`MemoryStore`] in tests. [`Stores`] bundles
//! one implementation of each.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod carts;
pub mod counters;
pub mod memory;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{AccountId, CartOwner, OrderId, OrderStatus, ProductId};

use crate::models::{
    Cart, NewOrder, NewProduct, NewReview, Order, OrderUpdate, Product, Review, WishlistItem,
};

pub use carts::CartRepository;
pub use counters::CounterRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate review).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Convert a stored `INTEGER` count to `u32`.
pub(crate) fn count_from_db(value: i32, what: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {what} in database: {value}")))
}

/// Convert a `u32` count to the `INTEGER` column type.
pub(crate) fn count_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {value} out of range")))
}

/// Outcome of an atomic check-and-decrement on a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was reduced; `remaining` is the new level.
    Decremented { remaining: u32 },
    /// Stock was left untouched because fewer than the requested units remain.
    Insufficient { available: u32 },
    /// No such product.
    NotFound,
}

/// Catalog reads plus the stock counter.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch one product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products; missing IDs are simply absent from the result.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Decrement stock by `amount` only if at least `amount` units remain,
    /// in one atomic step.
    async fn decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<StockDecrement, RepositoryError>;

    /// Put `amount` units back (compensation for a failed placement).
    async fn restock(&self, id: ProductId, amount: u32) -> Result<(), RepositoryError>;

    /// Insert a product, or replace the product with the same name.
    async fn upsert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Cart documents keyed by owner.
///
/// Carts are loaded and saved whole; concurrent writers for the same owner
/// are last-write-wins.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the owner's cart, if one was ever saved.
    async fn load(&self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError>;

    /// Replace the owner's stored lines with `cart.items`, creating the cart
    /// if needed.
    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Placed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order (header and lines together) with status `Pending`.
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch one order.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// An account's orders, newest first.
    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError>;

    /// All orders, newest first, optionally restricted to one status.
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError>;

    /// Apply a partial update, but only while the order is still in
    /// `expected` status (compare-and-set). Returns `None` if the order does
    /// not exist or its status has moved on.
    async fn update(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Named monotonically increasing counters.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically increment the counter and return the new value (first call
    /// returns 1).
    async fn next(&self, name: &str) -> Result<i64, RepositoryError>;

    /// Last issued value, or 0 if the counter has never been used.
    async fn current(&self, name: &str) -> Result<i64, RepositoryError>;
}

/// Per-account wishlists.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// Saved products, most recent first.
    async fn list(&self, account: AccountId) -> Result<Vec<WishlistItem>, RepositoryError>;

    /// Save a product. Saving twice is a no-op.
    async fn add(&self, account: AccountId, product: ProductId) -> Result<(), RepositoryError>;

    /// Forget a product. Returns whether it was saved.
    async fn remove(&self, account: AccountId, product: ProductId)
    -> Result<bool, RepositoryError>;
}

/// Product reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Reviews of a product, newest first.
    async fn list_for_product(&self, product: ProductId) -> Result<Vec<Review>, RepositoryError>;

    /// Store a review.
    ///
    /// Returns `RepositoryError::Conflict` if the account already reviewed the
    /// product.
    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError>;
}

/// One implementation of every store, shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub sequences: Arc<dyn SequenceStore>,
    pub wishlist: Arc<dyn WishlistStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            catalog: Arc::new(ProductRepository::new(pool.clone())),
            carts: Arc::new(CartRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            sequences: Arc::new(CounterRepository::new(pool.clone())),
            wishlist: Arc::new(WishlistRepository::new(pool.clone())),
            reviews: Arc::new(ReviewRepository::new(pool.clone())),
        }
    }

    /// Every store backed by the same in-memory instance.
    #[must_use]
    pub fn in_memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            sequences: store.clone(),
            wishlist: store.clone(),
            reviews: store.clone(),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
