//! Order types.
//!
//! An order is immutable evidence of what was charged: its lines carry the
//! unit price captured at placement and are never recomputed from the live
//! catalog. Only `status` and `is_paid` change after creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{
    AccountId, OrderCode, OrderId, OrderStatus, PaymentMethod, Phone, Pincode, ProductId,
};

/// A snapshotted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product name at the time of purchase.
    pub product_name: String,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

impl OrderLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Validated shipping destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: Phone,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub code: OrderCode,
    pub account_id: AccountId,
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything storage needs to persist a freshly placed order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub code: OrderCode,
    pub account_id: AccountId,
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
}

impl NewOrder {
    /// Sum of line totals.
    #[must_use]
    pub fn line_subtotal(items: &[OrderLine]) -> Decimal {
        items.iter().map(OrderLine::line_total).sum()
    }
}

/// Administrative partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub is_paid: Option<bool>,
}

impl OrderUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_paid.is_none()
    }
}
