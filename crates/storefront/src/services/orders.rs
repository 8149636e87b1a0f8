//! Order placement workflow.
//!
//! Placement runs as a saga over independent storage calls:
//!
//! 1. validate every line against the catalog (no mutation yet)
//! 2. atomically decrement stock line by line
//! 3. allocate the next `ORD{n}` code
//! 4. persist the order with snapshotted lines
//!
//! If step 2 loses a race, or step 3 or 4 fails, every unit already taken
//! in this call is put back before the error is returned.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use bazaar_core::{AccountId, OrderId, OrderStatus, PaymentMethod, ProductId, compute_shipping};

/// Decimal places stored for every amount (`NUMERIC(12, 2)`).
const MONEY_SCALE: u32 = 2;

use super::sequence::SequenceGenerator;
use crate::db::{CatalogStore, OrderStore, RepositoryError, StockDecrement, Stores};
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{NewOrder, Order, OrderLine, OrderUpdate, Product, ShippingAddress};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A line cannot be fulfilled.
    #[error("Insufficient stock for {name}")]
    OutOfStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// Malformed request.
    #[error("{0}")]
    Validation(String),

    /// Order does not exist (or belongs to someone else).
    #[error("order not found")]
    NotFound,

    /// Status change not allowed from the current status.
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Which price is frozen into an order line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePolicy {
    /// The price the client submitted with the line (catalog price when
    /// none was submitted).
    #[default]
    Submitted,
    /// The live catalog price at placement time.
    Catalog,
}

impl FromStr for PricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" | "client" => Ok(Self::Submitted),
            "catalog" | "live" => Ok(Self::Catalog),
            other => Err(format!("unknown price policy: {other}")),
        }
    }
}

/// One requested order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Client-submitted unit price.
    pub price: Option<Decimal>,
}

/// A validated placement request.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub account: AccountId,
    pub lines: Vec<LineRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub is_paid: Option<bool>,
    /// Fee the client computed; only compared against the server's.
    pub client_shipping: Option<Decimal>,
}

/// Order placement, queries and admin updates.
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    sequence: SequenceGenerator,
    price_policy: PricePolicy,
}

impl OrderService {
    #[must_use]
    pub fn new(stores: &Stores, price_policy: PricePolicy) -> Self {
        Self {
            catalog: Arc::clone(&stores.catalog),
            orders: Arc::clone(&stores.orders),
            sequence: SequenceGenerator::new(Arc::clone(&stores.sequences)),
            price_policy,
        }
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for malformed lines,
    /// `OrderError::OutOfStock` naming the first line that cannot be
    /// fulfilled (stock is left as it was), or `OrderError::Repository`
    /// if storage fails (stock taken by this call is restored first).
    #[instrument(skip(self, request), fields(account = %request.account, lines = request.lines.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, OrderError> {
        validate_lines(&request.lines)?;

        // Validation pass.
        let ids: Vec<ProductId> = request.lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .catalog
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut snapshot = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = products
                .get(&line.product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| OrderError::OutOfStock {
                    product_id: line.product_id,
                    name: products
                        .get(&line.product_id)
                        .map_or_else(|| format!("product {}", line.product_id), |p| p.name.clone()),
                    requested: line.quantity,
                    available: 0,
                })?;
            if !product.can_fulfill(line.quantity) {
                return Err(OrderError::OutOfStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            snapshot.push(OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                price: self.snapshot_price(line, product),
            });
        }

        // Decrement pass.
        let mut taken: Vec<(ProductId, u32)> = Vec::with_capacity(snapshot.len());
        for line in &snapshot {
            let outcome = match self.catalog.decrement_stock(line.product_id, line.quantity).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.restore(&taken).await;
                    return Err(e.into());
                }
            };
            match outcome {
                StockDecrement::Decremented { .. } => taken.push((line.product_id, line.quantity)),
                StockDecrement::Insufficient { available } => {
                    self.restore(&taken).await;
                    warn!(product_id = %line.product_id, available, "Lost stock race during placement");
                    return Err(OrderError::OutOfStock {
                        product_id: line.product_id,
                        name: line.product_name.clone(),
                        requested: line.quantity,
                        available,
                    });
                }
                StockDecrement::NotFound => {
                    self.restore(&taken).await;
                    return Err(OrderError::OutOfStock {
                        product_id: line.product_id,
                        name: line.product_name.clone(),
                        requested: line.quantity,
                        available: 0,
                    });
                }
            }
        }

        let subtotal = NewOrder::line_subtotal(&snapshot);
        let shipping_fee = compute_shipping(&request.shipping_address.state, subtotal);
        if let Some(client_fee) = request.client_shipping
            && client_fee != shipping_fee
        {
            warn!(%client_fee, %shipping_fee, "Ignoring client-computed shipping fee");
        }

        let code = match self.sequence.next_order_code().await {
            Ok(code) => code,
            Err(e) => {
                self.restore(&taken).await;
                return Err(e.into());
            }
        };

        let new_order = NewOrder {
            code,
            account_id: request.account,
            items: snapshot,
            shipping_address: request.shipping_address,
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            payment_method: request.payment_method,
            is_paid: request.is_paid.unwrap_or(false),
        };

        let order = match self.orders.insert(&new_order).await {
            Ok(order) => order,
            Err(e) => {
                self.restore(&taken).await;
                return Err(e.into());
            }
        };

        info!(order_id = %order.id, code = %order.code, total = %order.total, "Order placed");
        crate::error::add_breadcrumb(
            "order",
            "Order placed",
            Some(&[("code", order.code.as_str())]),
        );
        Ok(order)
    }

    fn snapshot_price(&self, line: &LineRequest, product: &Product) -> Decimal {
        let price = match self.price_policy {
            PricePolicy::Submitted => line.price.unwrap_or(product.price),
            PricePolicy::Catalog => product.price,
        };
        price.round_dp(MONEY_SCALE)
    }

    /// Put back stock taken by a failed placement.
    async fn restore(&self, taken: &[(ProductId, u32)]) {
        for &(product_id, quantity) in taken {
            if let Err(e) = self.catalog.restock(product_id, quantity).await {
                let event_id = sentry::capture_error(&e);
                error!(
                    error = %e,
                    product_id = %product_id,
                    quantity,
                    sentry_event_id = %event_id,
                    "Failed to restore stock after aborted order"
                );
            }
        }
    }

    /// An account's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage fails.
    #[instrument(skip(self))]
    pub async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_account(account).await?)
    }

    /// One of the account's own orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to another account.
    #[instrument(skip(self))]
    pub async fn get_for_account(
        &self,
        account: AccountId,
        id: OrderId,
    ) -> Result<Order, OrderError> {
        self.orders
            .get(id)
            .await?
            .filter(|o| o.account_id == account)
            .ok_or(OrderError::NotFound)
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage fails.
    #[instrument(skip(self))]
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list(status).await?)
    }

    /// Apply an administrative update to status and/or paid flag.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown orders and
    /// `OrderError::InvalidTransition` for disallowed status moves.
    #[instrument(skip(self))]
    pub async fn update(&self, id: OrderId, update: OrderUpdate) -> Result<Order, OrderError> {
        let current = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if update.is_empty() {
            return Ok(current);
        }
        if let Some(next) = update.status
            && !current.status.can_transition_to(next)
        {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let Some(order) = self.orders.update(id, current.status, update).await? else {
            // Someone else changed the status between the read and the write.
            let latest = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
            warn!(code = %latest.code, status = %latest.status, "Order status changed concurrently");
            return Err(OrderError::InvalidTransition {
                from: latest.status,
                to: update.status.unwrap_or(latest.status),
            });
        };
        info!(code = %order.code, status = %order.status, is_paid = order.is_paid, "Order updated");
        Ok(order)
    }
}

fn validate_lines(lines: &[LineRequest]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::Validation("Order must contain at least one item".to_owned()));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(OrderError::Validation(format!(
                "Quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
                line.product_id
            )));
        }
        if line.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(OrderError::Validation(format!(
                "Price for product {} cannot be negative",
                line.product_id
            )));
        }
        if line.price.is_some_and(|p| p.normalize().scale() > MONEY_SCALE) {
            return Err(OrderError::Validation(format!(
                "Price for product {} has more than {MONEY_SCALE} decimal places",
                line.product_id
            )));
        }
        if !seen.insert(line.product_id) {
            return Err(OrderError::Validation(format!(
                "Product {} appears more than once",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use bazaar_core::{Phone, Pincode};

    use crate::db::MemoryStore;
    use crate::services::sequence::ORDER_SEQUENCE;

    use super::*;

    fn address(state: &str) -> ShippingAddress {
        ShippingAddress {
            full_name: "Meena Raghavan".to_owned(),
            phone: Phone::parse("9876543210").unwrap(),
            address: "12 Car Street".to_owned(),
            city: "Madurai".to_owned(),
            state: state.to_owned(),
            pincode: Pincode::parse("625001").unwrap(),
        }
    }

    fn request(lines: Vec<LineRequest>, state: &str) -> PlaceOrder {
        PlaceOrder {
            account: AccountId::new(1),
            lines,
            shipping_address: address(state),
            payment_method: PaymentMethod::Cod,
            is_paid: None,
            client_shipping: None,
        }
    }

    fn line(product_id: ProductId, quantity: u32, price: u32) -> LineRequest {
        LineRequest {
            product_id,
            quantity,
            price: Some(Decimal::from(price)),
        }
    }

    fn service(store: &Arc<MemoryStore>) -> OrderService {
        OrderService::new(&Stores::in_memory(store), PricePolicy::Submitted)
    }

    #[tokio::test]
    async fn test_end_to_end_placement() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Silk Dupatta", Decimal::from(400), 5).await;
        let svc = service(&store);
        let before = svc.sequence.current(ORDER_SEQUENCE).await.unwrap();

        let order = svc
            .place_order(request(vec![line(a.id, 2, 400)], "Tamil Nadu"))
            .await
            .unwrap();

        assert_eq!(store.stock(a.id).await, Some(3));
        assert_eq!(order.code.as_str(), format!("ORD{}", before + 1));
        assert_eq!(order.subtotal, Decimal::from(800));
        assert_eq!(order.shipping_fee, Decimal::ZERO);
        assert_eq!(order.total, Decimal::from(800));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert_eq!(order.items[0].product_name, "Silk Dupatta");
    }

    #[tokio::test]
    async fn test_out_of_stock_leaves_stock_untouched() {
        let store = Arc::new(MemoryStore::new());
        let b = store.insert_product("Kanjivaram Saree", Decimal::from(5_000), 3).await;
        let svc = service(&store);

        let err = svc
            .place_order(request(vec![line(b.id, 10, 5_000)], "Kerala"))
            .await
            .unwrap_err();

        match err {
            OrderError::OutOfStock {
                product_id,
                name,
                available,
                ..
            } => {
                assert_eq!(product_id, b.id);
                assert_eq!(name, "Kanjivaram Saree");
                assert_eq!(available, 3);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }
        assert_eq!(store.stock(b.id).await, Some(3));
        assert_eq!(svc.sequence.current(ORDER_SEQUENCE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_on_later_line_decrements_nothing() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Tea", Decimal::from(100), 10).await;
        let b = store.insert_product("Coffee", Decimal::from(100), 1).await;
        let svc = service(&store);

        let err = svc
            .place_order(request(vec![line(a.id, 4, 100), line(b.id, 2, 100)], "Goa"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::OutOfStock { product_id, .. } if product_id == b.id));
        assert_eq!(store.stock(a.id).await, Some(10));
        assert_eq!(store.stock(b.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_inactive_and_missing_products_are_out_of_stock() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Retired", Decimal::from(10), 10).await;
        store.set_active(a.id, false).await;
        let svc = service(&store);

        assert!(matches!(
            svc.place_order(request(vec![line(a.id, 1, 10)], "Goa")).await,
            Err(OrderError::OutOfStock { available: 0, .. })
        ));
        let err = svc
            .place_order(request(vec![line(ProductId::new(404), 1, 10)], "Goa"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for product 404");
    }

    #[tokio::test]
    async fn test_persistence_failure_restores_stock() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Honey", Decimal::from(300), 6).await;
        let b = store.insert_product("Ghee", Decimal::from(500), 2).await;
        store.set_fail_on_order_insert(true).await;
        let svc = service(&store);

        let err = svc
            .place_order(request(vec![line(a.id, 2, 300), line(b.id, 2, 500)], "Goa"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Repository(_)));
        assert_eq!(store.stock(a.id).await, Some(6));
        assert_eq!(store.stock(b.id).await, Some(2));
    }

    #[tokio::test]
    async fn test_code_allocation_failure_restores_stock() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Honey", Decimal::from(300), 6).await;
        store.set_fail_on_sequence(true).await;
        let svc = service(&store);

        assert!(
            svc.place_order(request(vec![line(a.id, 5, 300)], "Goa"))
                .await
                .is_err()
        );
        assert_eq!(store.stock(a.id).await, Some(6));
    }

    #[tokio::test]
    async fn test_concurrent_orders_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Last Units", Decimal::from(100), 7).await;
        let svc = service(&store);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let svc = svc.clone();
                let quantity = 1 + i % 3;
                tokio::spawn(async move {
                    svc.place_order(request(vec![line(a.id, quantity, 100)], "Goa"))
                        .await
                        .map(|o| o.items[0].quantity)
                })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(quantity) => sold += quantity,
                Err(OrderError::OutOfStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        let remaining = store.stock(a.id).await.unwrap();
        assert!(sold <= 7);
        assert_eq!(sold + remaining, 7);
    }

    #[tokio::test]
    async fn test_snapshot_price_survives_catalog_change() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Brass Bell", Decimal::from(100), 5).await;
        let svc = service(&store);

        let order = svc
            .place_order(request(vec![line(a.id, 1, 100)], "Goa"))
            .await
            .unwrap();
        store.set_price(a.id, Decimal::from(150)).await;

        let reloaded = svc.get_for_account(AccountId::new(1), order.id).await.unwrap();
        assert_eq!(reloaded.items[0].price, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_catalog_price_policy() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Brass Bell", Decimal::from(120), 5).await;
        let svc = OrderService::new(&Stores::in_memory(&store), PricePolicy::Catalog);

        let order = svc
            .place_order(request(vec![line(a.id, 1, 1)], "Goa"))
            .await
            .unwrap();
        assert_eq!(order.items[0].price, Decimal::from(120));
    }

    #[tokio::test]
    async fn test_client_shipping_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 5).await;
        let svc = service(&store);

        let mut req = request(vec![line(a.id, 1, 100)], "Tamil Nadu");
        req.client_shipping = Some(Decimal::ZERO);
        req.is_paid = Some(true);
        let order = svc.place_order(req).await.unwrap();
        assert_eq!(order.shipping_fee, Decimal::from(50));
        assert_eq!(order.total, Decimal::from(150));
        assert!(order.is_paid);
    }

    #[tokio::test]
    async fn test_line_validation() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 5).await;
        let svc = service(&store);

        for lines in [
            vec![],
            vec![line(a.id, 0, 100)],
            vec![line(a.id, 1, 100), line(a.id, 1, 100)],
            vec![LineRequest {
                product_id: a.id,
                quantity: 1,
                price: Some(Decimal::from(-1)),
            }],
        ] {
            assert!(matches!(
                svc.place_order(request(lines, "Goa")).await,
                Err(OrderError::Validation(_))
            ));
        }
        assert_eq!(store.stock(a.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_sub_paisa_prices_rejected() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Cardamom", Decimal::from(100), 5).await;
        let svc = service(&store);

        let err = svc
            .place_order(request(
                vec![LineRequest {
                    product_id: a.id,
                    quantity: 3,
                    price: Some(Decimal::new(33_335, 3)),
                }],
                "Goa",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert_eq!(store.stock(a.id).await, Some(5));

        // Trailing zeros are not extra precision.
        let order = svc
            .place_order(request(
                vec![LineRequest {
                    product_id: a.id,
                    quantity: 3,
                    price: Some(Decimal::new(33_340, 3)),
                }],
                "Goa",
            ))
            .await
            .unwrap();
        let line_sum: Decimal = order
            .items
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(order.items[0].price, Decimal::new(3_334, 2));
        assert_eq!(order.subtotal, Decimal::new(10_002, 2));
        assert_eq!(line_sum, order.subtotal);

        let reloaded = svc.get_for_account(AccountId::new(1), order.id).await.unwrap();
        assert_eq!(reloaded.items, order.items);
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first_and_scoped() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 50).await;
        let svc = service(&store);

        let first = svc.place_order(request(vec![line(a.id, 1, 100)], "Goa")).await.unwrap();
        let second = svc.place_order(request(vec![line(a.id, 2, 100)], "Goa")).await.unwrap();
        let mut other = request(vec![line(a.id, 1, 100)], "Goa");
        other.account = AccountId::new(2);
        let foreign = svc.place_order(other).await.unwrap();

        let mine = svc.list_for_account(AccountId::new(1)).await.unwrap();
        assert_eq!(
            mine.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(matches!(
            svc.get_for_account(AccountId::new(1), foreign.id).await,
            Err(OrderError::NotFound)
        ));
        assert_eq!(svc.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 5).await;
        let svc = service(&store);
        let order = svc.place_order(request(vec![line(a.id, 1, 100)], "Goa")).await.unwrap();

        let shipped = svc
            .update(
                order.id,
                OrderUpdate {
                    status: Some(OrderStatus::Shipped),
                    is_paid: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.is_paid);
        assert_eq!(shipped.code, order.code);

        assert!(matches!(
            svc.update(
                order.id,
                OrderUpdate {
                    status: Some(OrderStatus::Pending),
                    is_paid: None,
                }
            )
            .await,
            Err(OrderError::InvalidTransition { .. })
        ));

        let cancelled = svc
            .update(
                order.id,
                OrderUpdate {
                    status: Some(OrderStatus::Cancelled),
                    is_paid: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        // Cancelling does not restock.
        assert_eq!(store.stock(a.id).await, Some(4));

        assert!(matches!(
            svc.list(Some(OrderStatus::Cancelled)).await.unwrap().as_slice(),
            [o] if o.id == order.id
        ));
        assert!(matches!(
            svc.update(OrderId::new(999), OrderUpdate::default()).await,
            Err(OrderError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_status_update_is_conditional_on_current_status() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 5).await;
        let svc = service(&store);
        let order = svc.place_order(request(vec![line(a.id, 1, 100)], "Goa")).await.unwrap();
        let to = |status| OrderUpdate {
            status: Some(status),
            is_paid: None,
        };

        // A write based on a stale read of `Pending` is refused once the
        // order has moved on.
        let orders: &dyn OrderStore = &*store;
        assert!(
            orders
                .update(order.id, OrderStatus::Pending, to(OrderStatus::Shipped))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            orders
                .update(order.id, OrderStatus::Pending, to(OrderStatus::Cancelled))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            svc.list(None).await.unwrap()[0].status,
            OrderStatus::Shipped
        );
    }

    #[tokio::test]
    async fn test_racing_terminal_updates_only_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let a = store.insert_product("Mat", Decimal::from(100), 5).await;
        let svc = service(&store);
        let order = svc.place_order(request(vec![line(a.id, 1, 100)], "Goa")).await.unwrap();
        svc.update(
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::Shipped),
                is_paid: None,
            },
        )
        .await
        .unwrap();

        let handles: Vec<_> = [OrderStatus::Delivered, OrderStatus::Cancelled]
            .into_iter()
            .map(|status| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.update(
                        order.id,
                        OrderUpdate {
                            status: Some(status),
                            is_paid: None,
                        },
                    )
                    .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(updated) => winners.push(updated.status),
                Err(OrderError::InvalidTransition { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(winners.len(), 1);
        let stored = svc.get_for_account(AccountId::new(1), order.id).await.unwrap();
        assert_eq!(stored.status, winners[0]);
    }

    #[test]
    fn test_price_policy_parse() {
        assert_eq!("Catalog".parse::<PricePolicy>().unwrap(), PricePolicy::Catalog);
        assert_eq!("submitted".parse::<PricePolicy>().unwrap(), PricePolicy::Submitted);
        assert!("auction".parse::<PricePolicy>().is_err());
    }
}
