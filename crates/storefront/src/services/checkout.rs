//! Checkout review.
//!
//! Summarizes a cart against live stock and prices before the shopper
//! commits. Nothing here reserves stock; placement re-checks everything.

use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{ProductId, ShippingZone, compute_shipping};

use super::cart::CartView;

/// One cart line as it would be ordered right now.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
    pub line_total: Decimal,
    /// Units currently in stock (0 for missing or inactive products).
    pub available: u32,
    pub in_stock: bool,
    pub warning: Option<String>,
}

/// Cart totals for a destination.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub items: Vec<CheckoutLine>,
    pub subtotal: Decimal,
    pub shipping_zone: ShippingZone,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    /// False when the cart is empty or any line cannot be fulfilled.
    pub can_checkout: bool,
}

/// Build the checkout summary for a detailed cart shipped to `region`.
#[must_use]
pub fn summarize(cart: &CartView, region: &str) -> CheckoutSummary {
    let items: Vec<CheckoutLine> = cart
        .items
        .iter()
        .map(|item| {
            let product = item.product.as_ref().filter(|p| p.is_active);
            let available = product.map_or(0, |p| p.stock);
            let in_stock = product.is_some_and(|p| p.can_fulfill(item.quantity));
            let warning = match (&item.product, product) {
                (None, _) => Some("This product is no longer available".to_owned()),
                (Some(_), None) => Some("This product is currently unavailable".to_owned()),
                (Some(p), Some(_)) if !in_stock => Some(format!(
                    "Only {available} of {} left in stock",
                    p.name
                )),
                _ => None,
            };
            CheckoutLine {
                product_id: item.product_id,
                name: item.product.as_ref().map(|p| p.name.clone()),
                quantity: item.quantity,
                unit_price: item.product.as_ref().map(|p| p.price),
                line_total: item.line_total,
                available,
                in_stock,
                warning,
            }
        })
        .collect();

    let subtotal = cart.subtotal;
    let shipping_fee = compute_shipping(region, subtotal);
    let can_checkout = !items.is_empty() && items.iter().all(|i| i.in_stock);

    CheckoutSummary {
        items,
        subtotal,
        shipping_zone: ShippingZone::for_region(region),
        shipping_fee,
        total: subtotal + shipping_fee,
        can_checkout,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::{AccountId, CartOwner};

    use crate::db::{MemoryStore, Stores};
    use crate::services::CartService;

    use super::*;

    #[tokio::test]
    async fn test_summary_free_home_shipping() {
        let store = Arc::new(MemoryStore::new());
        let product = store.insert_product("Saree", Decimal::from(400), 5).await;
        let service = CartService::new(&Stores::in_memory(&store));
        let owner = CartOwner::Account(AccountId::new(1));
        service.add(&owner, product.id, 2).await.unwrap();

        let summary = summarize(&service.view(&owner).await.unwrap(), "Tamil Nadu");
        assert_eq!(summary.subtotal, Decimal::from(800));
        assert_eq!(summary.shipping_fee, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::from(800));
        assert_eq!(summary.shipping_zone, ShippingZone::Home);
        assert!(summary.can_checkout);
    }

    #[tokio::test]
    async fn test_summary_flags_short_and_inactive_lines() {
        let store = Arc::new(MemoryStore::new());
        let short = store.insert_product("Brass Lamp", Decimal::from(100), 3).await;
        let hidden = store.insert_product("Clay Pot", Decimal::from(60), 10).await;
        let service = CartService::new(&Stores::in_memory(&store));
        let owner = CartOwner::Account(AccountId::new(1));
        service.add(&owner, short.id, 10).await.unwrap();
        service.add(&owner, hidden.id, 1).await.unwrap();
        store.set_active(hidden.id, false).await;

        let summary = summarize(&service.view(&owner).await.unwrap(), "Goa");
        assert!(!summary.can_checkout);
        assert_eq!(summary.shipping_fee, Decimal::from(200));

        let short_line = &summary.items[0];
        assert!(!short_line.in_stock);
        assert_eq!(short_line.available, 3);
        assert_eq!(
            short_line.warning.as_deref(),
            Some("Only 3 of Brass Lamp left in stock")
        );

        let hidden_line = &summary.items[1];
        assert!(!hidden_line.in_stock);
        assert_eq!(hidden_line.available, 0);
        assert!(hidden_line.warning.is_some());
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_checkout() {
        let store = Arc::new(MemoryStore::new());
        let service = CartService::new(&Stores::in_memory(&store));
        let owner = CartOwner::Account(AccountId::new(1));

        let summary = summarize(&service.view(&owner).await.unwrap(), "Kerala");
        assert!(!summary.can_checkout);
        assert_eq!(summary.shipping_fee, Decimal::from(150));
    }
}
