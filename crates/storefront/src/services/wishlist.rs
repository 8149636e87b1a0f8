//! Wishlist service.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{AccountId, ProductId};

use crate::db::{CatalogStore, RepositoryError, Stores, WishlistStore};
use crate::models::WishlistItem;

/// Errors that can occur during wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Saved products per account.
#[derive(Clone)]
pub struct WishlistService {
    wishlist: Arc<dyn WishlistStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl WishlistService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            wishlist: Arc::clone(&stores.wishlist),
            catalog: Arc::clone(&stores.catalog),
        }
    }

    /// The account's saved products, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if storage fails.
    pub async fn list(&self, account: AccountId) -> Result<Vec<WishlistItem>, WishlistError> {
        Ok(self.wishlist.list(account).await?)
    }

    /// Save a product; saving it again changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::ProductNotFound` for unknown products.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        account: AccountId,
        product_id: ProductId,
    ) -> Result<Vec<WishlistItem>, WishlistError> {
        if self.catalog.get_product(product_id).await?.is_none() {
            return Err(WishlistError::ProductNotFound(product_id));
        }
        self.wishlist.add(account, product_id).await?;
        self.list(account).await
    }

    /// Forget a product; forgetting an unsaved product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if storage fails.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        account: AccountId,
        product_id: ProductId,
    ) -> Result<Vec<WishlistItem>, WishlistError> {
        self.wishlist.remove(account, product_id).await?;
        self.list(account).await
    }
}
