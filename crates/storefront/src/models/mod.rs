//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`]. Handlers serialize them directly as JSON.

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod wishlist;

pub use cart::{Cart, CartLine, CartLineError};
pub use order::{NewOrder, Order, OrderLine, OrderUpdate, ShippingAddress};
pub use product::{NewProduct, Product};
pub use review::{NewReview, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use wishlist::WishlistItem;
