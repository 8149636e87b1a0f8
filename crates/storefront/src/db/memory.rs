//! In-memory implementation of every store.
//!
//! Used by unit and route tests. Each collection sits behind its own
//! `tokio` lock; operations that must be atomic (stock decrement, sequence
//! increment) complete under a single write guard.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use bazaar_core::{AccountId, CartOwner, OrderId, OrderStatus, ProductId, ReviewId};

use super::{
    CartStore, CatalogStore, OrderStore, RepositoryError, ReviewStore, SequenceStore,
    StockDecrement, WishlistStore,
};
use crate::models::{
    Cart, CartLine, NewOrder, NewProduct, NewReview, Order, OrderUpdate, Product, Review,
    WishlistItem,
};

/// Memory-backed store with optional failure injection.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    carts: RwLock<HashMap<CartOwner, Vec<CartLine>>>,
    orders: RwLock<BTreeMap<OrderId, Order>>,
    counters: Mutex<HashMap<String, i64>>,
    wishlists: RwLock<HashMap<AccountId, Vec<WishlistItem>>>,
    reviews: RwLock<Vec<Review>>,
    fail_on_order_insert: RwLock<bool>,
    fail_on_sequence: RwLock<bool>,
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolClosed)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active product and return it.
    pub async fn insert_product(&self, name: &str, price: Decimal, stock: u32) -> Product {
        let mut products = self.products.write().await;
        let next = products.keys().next_back().map_or(1, |id| id.as_i32() + 1);
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(next),
            name: name.to_owned(),
            category: String::new(),
            old_price: None,
            price,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        products.insert(product.id, product.clone());
        product
    }

    /// Change a product's live price.
    pub async fn set_price(&self, id: ProductId, price: Decimal) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.price = price;
            product.updated_at = Utc::now();
        }
    }

    /// Activate or deactivate a product.
    pub async fn set_active(&self, id: ProductId, is_active: bool) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.is_active = is_active;
        }
    }

    /// Current stock of a product.
    pub async fn stock(&self, id: ProductId) -> Option<u32> {
        self.products.read().await.get(&id).map(|p| p.stock)
    }

    /// Make every subsequent `OrderStore::insert` fail.
    pub async fn set_fail_on_order_insert(&self, fail: bool) {
        *self.fail_on_order_insert.write().await = fail;
    }

    /// Make every subsequent `SequenceStore::next` fail.
    pub async fn set_fail_on_sequence(&self, fail: bool) {
        *self.fail_on_sequence.write().await = fail;
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = ids.iter().filter_map(|id| products.get(id).cloned()).collect();
        found.sort_by_key(|p| p.id);
        found.dedup_by_key(|p| p.id);
        Ok(found)
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<StockDecrement, RepositoryError> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(StockDecrement::NotFound);
        };
        match product.stock.checked_sub(amount) {
            Some(remaining) => {
                product.stock = remaining;
                product.updated_at = Utc::now();
                Ok(StockDecrement::Decremented { remaining })
            }
            None => Ok(StockDecrement::Insufficient {
                available: product.stock,
            }),
        }
    }

    async fn restock(&self, id: ProductId, amount: u32) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.stock = product.stock.saturating_add(amount);
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        let now = Utc::now();
        let existing = products.values().find(|p| p.name == new.name).map(|p| (p.id, p.created_at));
        let (id, created_at) = existing.unwrap_or_else(|| {
            let next = products.keys().next_back().map_or(1, |id| id.as_i32() + 1);
            (ProductId::new(next), now)
        });
        let product = Product {
            id,
            name: new.name.clone(),
            category: new.category.clone(),
            old_price: new.old_price,
            price: new.price,
            stock: new.stock,
            is_active: new.is_active,
            created_at,
            updated_at: now,
        };
        products.insert(id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn load(&self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(owner).map(|items| Cart {
            owner: *owner,
            items: items.clone(),
        }))
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        self.carts
            .write()
            .await
            .insert(cart.owner, cart.items.clone());
        Ok(())
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        if *self.fail_on_order_insert.read().await {
            return Err(injected_failure());
        }

        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.code == new.code) {
            return Err(RepositoryError::Conflict("order code already issued".to_owned()));
        }
        let next = orders.keys().next_back().map_or(1, |id| id.as_i32() + 1);
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(next),
            code: new.code.clone(),
            account_id: new.account_id,
            items: new.items.clone(),
            shipping_address: new.shipping_address.clone(),
            subtotal: new.subtotal,
            shipping_fee: new.shipping_fee,
            total: new.total,
            payment_method: new.payment_method,
            is_paid: new.is_paid,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError> {
        let mut found: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.account_id == account)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let mut found: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn update(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id).filter(|o| o.status == expected) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(is_paid) = update.is_paid {
            order.is_paid = is_paid;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl SequenceStore for MemoryStore {
    async fn next(&self, name: &str) -> Result<i64, RepositoryError> {
        if *self.fail_on_sequence.read().await {
            return Err(injected_failure());
        }
        let mut counters = self.counters.lock().await;
        let seq = counters.entry(name.to_owned()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn current(&self, name: &str) -> Result<i64, RepositoryError> {
        Ok(self.counters.lock().await.get(name).copied().unwrap_or(0))
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn list(&self, account: AccountId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let mut items = self
            .wishlists
            .read()
            .await
            .get(&account)
            .cloned()
            .unwrap_or_default();
        items.reverse();
        Ok(items)
    }

    async fn add(&self, account: AccountId, product: ProductId) -> Result<(), RepositoryError> {
        let mut wishlists = self.wishlists.write().await;
        let items = wishlists.entry(account).or_default();
        if !items.iter().any(|i| i.product_id == product) {
            items.push(WishlistItem {
                product_id: product,
                added_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn remove(
        &self,
        account: AccountId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut wishlists = self.wishlists.write().await;
        let Some(items) = wishlists.get_mut(&account) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|i| i.product_id != product);
        Ok(items.len() != before)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn list_for_product(&self, product: ProductId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.product_id == product)
            .cloned()
            .collect())
    }

    async fn insert(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        let mut reviews = self.reviews.write().await;
        if reviews
            .iter()
            .any(|r| r.product_id == new.product_id && r.account_id == new.account_id)
        {
            return Err(RepositoryError::Conflict(
                "you have already reviewed this product".to_owned(),
            ));
        }
        let next = i32::try_from(reviews.len()).map_or(i32::MAX, |n| n + 1);
        let review = Review {
            id: ReviewId::new(next),
            product_id: new.product_id,
            account_id: new.account_id,
            rating: new.rating,
            comment: new.comment.clone(),
            created_at: Utc::now(),
        };
        reviews.push(review.clone());
        Ok(review)
    }
}
