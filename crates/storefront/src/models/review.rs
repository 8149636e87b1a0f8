//! Product review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{AccountId, ProductId, ReviewId};

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

/// A customer's review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub account_id: AccountId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated review ready to be stored.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub account_id: AccountId,
    pub rating: u8,
    pub comment: Option<String>,
}
