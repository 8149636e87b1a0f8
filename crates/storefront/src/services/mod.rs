//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart aggregate operations and guest-cart merging
//! - `checkout` - Pre-placement review (availability, shipping, totals)
//! - `orders` - Order placement workflow, queries and admin updates
//! - `sequence` - Named counters and order codes
//! - `wishlist` - Saved products per account
//! - `reviews` - Product reviews
//!
//! Services own `Arc` handles to the storage traits in [`crate::db`] and
//! are cheap to clone.

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod reviews;
pub mod sequence;
pub mod wishlist;

pub use cart::{CartError, CartItemView, CartService, CartView};
pub use checkout::{CheckoutLine, CheckoutSummary, summarize};
pub use orders::{LineRequest, OrderError, OrderService, PlaceOrder, PricePolicy};
pub use reviews::{ReviewError, ReviewService, ReviewSummary};
pub use sequence::{ORDER_SEQUENCE, SequenceGenerator};
pub use wishlist::{WishlistError, WishlistService};
