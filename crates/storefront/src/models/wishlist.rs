//! Wishlist types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::ProductId;

/// A product saved to an account's wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}
