//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::ProductId;

/// A catalog product (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category label.
    pub category: String,
    /// Struck-through "was" price, if the product is on offer.
    pub old_price: Option<Decimal>,
    /// Current selling price.
    pub price: Decimal,
    /// Units available to sell.
    pub stock: u32,
    /// Inactive products cannot be ordered.
    pub is_active: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub const fn can_fulfill(&self, quantity: u32) -> bool {
        self.is_active && self.stock >= quantity
    }

    /// Whether at least one unit can be sold right now.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.can_fulfill(1)
    }
}

/// Input for creating or replacing a product (used by the catalog seeder).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub old_price: Option<Decimal>,
    pub stock: u32,
    #[serde(default = "default_active", alias = "active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}
