//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogStore, Stores};
use crate::services::{CartService, OrderService, ReviewService, WishlistService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the services, the database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    catalog: Arc<dyn CatalogStore>,
    carts: CartService,
    orders: OrderService,
    wishlist: WishlistService,
    reviews: ReviewService,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let stores = Stores::postgres(&pool);
        Self::with_stores(config, &stores, Some(pool))
    }

    /// Create application state over arbitrary stores (in-memory in tests).
    #[must_use]
    pub fn with_stores(config: StorefrontConfig, stores: &Stores, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog: Arc::clone(&stores.catalog),
                carts: CartService::new(stores),
                orders: OrderService::new(stores, config.price_policy),
                wishlist: WishlistService::new(stores),
                reviews: ReviewService::new(stores),
                config,
                pool,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the database connection pool, if running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Read access to the catalog (product lookups).
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistService {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn reviews(&self) -> &ReviewService {
        &self.inner.reviews
    }
}
