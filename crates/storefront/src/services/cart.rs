//! Cart service.
//!
//! Every mutation loads the owner's cart, applies the change to the
//! [`Cart`] aggregate and saves it back whole. Stock is not consulted.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use bazaar_core::{AccountId, CartOwner, GuestId, ProductId};

use crate::db::{CartStore, CatalogStore, RepositoryError, Stores};
use crate::models::{Cart, CartLineError, Product};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Invalid quantity or missing line.
    #[error(transparent)]
    Line(#[from] CartLineError),

    /// The product being added does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart line joined with its live product record.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub quantity: u32,
    /// `None` when the product has since been removed from the catalog.
    pub product: Option<Product>,
    /// Live price times quantity (zero when the product is gone).
    pub line_total: Decimal,
}

/// A cart with product details and a live-price subtotal.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub owner: CartOwner,
    pub items: Vec<CartItemView>,
    pub total_quantity: u64,
    pub subtotal: Decimal,
}

/// Cart operations keyed by owner.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            carts: Arc::clone(&stores.carts),
            catalog: Arc::clone(&stores.catalog),
        }
    }

    /// The owner's cart, empty if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn get(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        Ok(self
            .carts
            .load(owner)
            .await?
            .unwrap_or_else(|| Cart::empty(*owner)))
    }

    /// The owner's cart joined with product details.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn view(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let cart = self.get(owner).await?;
        self.detail(cart).await
    }

    /// Join an already loaded cart with product details.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn detail(&self, cart: Cart) -> Result<CartView, CartError> {
        let ids: Vec<ProductId> = cart.items.iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .catalog
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items: Vec<CartItemView> = cart
            .items
            .iter()
            .map(|line| {
                let product = products.get(&line.product_id).cloned();
                let line_total = product
                    .as_ref()
                    .map_or(Decimal::ZERO, |p| p.price * Decimal::from(line.quantity));
                CartItemView {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product,
                    line_total,
                }
            })
            .collect();

        Ok(CartView {
            owner: cart.owner,
            total_quantity: cart.total_quantity(),
            subtotal: items.iter().map(|i| i.line_total).sum(),
            items,
        })
    }

    /// Add `quantity` units of a product, incrementing an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist,
    /// or `CartError::Line` for an out-of-range quantity.
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn add(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if self.catalog.get_product(product_id).await?.is_none() {
            return Err(CartError::ProductNotFound(product_id));
        }
        let mut cart = self.get(owner).await?;
        let total = cart.add(product_id, quantity)?;
        self.carts.save(&cart).await?;
        debug!(quantity = total, "Cart line updated");
        Ok(cart)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Line` if the line is absent or the quantity is
    /// out of range.
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(owner).await?;
        cart.set_quantity(product_id, quantity)?;
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    /// Remove a line. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn remove(&self, owner: &CartOwner, product_id: ProductId) -> Result<Cart, CartError> {
        let mut cart = self.get(owner).await?;
        if cart.remove(product_id) {
            self.carts.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        let mut cart = self.get(owner).await?;
        if !cart.is_empty() {
            cart.clear();
            self.carts.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Move a guest cart's lines into an account cart and empty the guest
    /// cart. Quantities for products in both carts are added together.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    #[instrument(skip(self), fields(guest = %guest, account = %account))]
    pub async fn merge_guest(&self, guest: GuestId, account: AccountId) -> Result<Cart, CartError> {
        let guest_owner = CartOwner::Guest(guest);
        let account_owner = CartOwner::Account(account);

        let mut account_cart = self.get(&account_owner).await?;
        let Some(mut guest_cart) = self.carts.load(&guest_owner).await? else {
            return Ok(account_cart);
        };
        if guest_cart.is_empty() {
            return Ok(account_cart);
        }

        account_cart.absorb(&guest_cart);
        self.carts.save(&account_cart).await?;
        guest_cart.clear();
        self.carts.save(&guest_cart).await?;

        debug!(lines = account_cart.items.len(), "Merged guest cart");
        Ok(account_cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crate::db::MemoryStore;

    use super::*;

    async fn setup() -> (Arc<MemoryStore>, CartService, ProductId, ProductId) {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Coconut Oil", Decimal::from(180), 5).await;
        let b = store.insert_product("Jaggery", Decimal::from(90), 0).await;
        let service = CartService::new(&Stores::in_memory(&store));
        (store, service, a.id, b.id)
    }

    fn owner() -> CartOwner {
        CartOwner::Account(AccountId::new(7))
    }

    #[tokio::test]
    async fn test_get_missing_cart_is_empty() {
        let (_, service, _, _) = setup().await;
        let cart = service.get(&owner()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.owner, owner());
    }

    #[tokio::test]
    async fn test_add_persists_and_ignores_stock() {
        let (_, service, a, b) = setup().await;
        service.add(&owner(), a, 2).await.unwrap();
        service.add(&owner(), a, 1).await.unwrap();
        // b has no stock; adding still succeeds.
        service.add(&owner(), b, 4).await.unwrap();

        let cart = service.get(&owner()).await.unwrap();
        assert_eq!(cart.line(a).unwrap().quantity, 3);
        assert_eq!(cart.line(b).unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let (_, service, _, _) = setup().await;
        let err = service.add(&owner(), ProductId::new(999), 1).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_everywhere() {
        let (_, service, a, _) = setup().await;
        assert!(matches!(
            service.add(&owner(), a, 0).await,
            Err(CartError::Line(CartLineError::InvalidQuantity(0)))
        ));
        service.add(&owner(), a, 2).await.unwrap();
        assert!(service.update_quantity(&owner(), a, 0).await.is_err());

        let cart = service.get(&owner()).await.unwrap();
        assert!(cart.items.iter().all(|l| l.quantity >= 1));
        assert_eq!(cart.line(a).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_update_missing_line_is_not_found() {
        let (_, service, a, _) = setup().await;
        assert!(matches!(
            service.update_quantity(&owner(), a, 3).await,
            Err(CartError::Line(CartLineError::LineNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_remove_and_clear_are_idempotent() {
        let (_, service, a, b) = setup().await;
        service.add(&owner(), a, 1).await.unwrap();
        service.add(&owner(), b, 1).await.unwrap();

        service.remove(&owner(), a).await.unwrap();
        service.remove(&owner(), a).await.unwrap();
        assert!(service.get(&owner()).await.unwrap().line(a).is_none());

        service.clear(&owner()).await.unwrap();
        service.clear(&owner()).await.unwrap();
        assert!(service.get(&owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_uses_live_prices() {
        let (store, service, a, _) = setup().await;
        service.add(&owner(), a, 2).await.unwrap();
        store.set_price(a, Decimal::from(200)).await;

        let view = service.view(&owner()).await.unwrap();
        assert_eq!(view.subtotal, Decimal::from(400));
        assert_eq!(view.total_quantity, 2);
        assert_eq!(view.items[0].product.as_ref().unwrap().name, "Coconut Oil");
    }

    #[tokio::test]
    async fn test_merge_guest_into_account() {
        let (_, service, a, b) = setup().await;
        let guest = GuestId::generate();
        let account = AccountId::new(7);

        service.add(&CartOwner::Guest(guest), a, 2).await.unwrap();
        service.add(&CartOwner::Guest(guest), b, 1).await.unwrap();
        service.add(&CartOwner::Account(account), a, 1).await.unwrap();

        let merged = service.merge_guest(guest, account).await.unwrap();
        assert_eq!(merged.line(a).unwrap().quantity, 3);
        assert_eq!(merged.line(b).unwrap().quantity, 1);
        assert!(service.get(&CartOwner::Guest(guest)).await.unwrap().is_empty());

        // A second merge is a no-op.
        let again = service.merge_guest(guest, account).await.unwrap();
        assert_eq!(again, merged);
    }
}
