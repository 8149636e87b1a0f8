//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `storefront` - HTTP API for carts, checkout, orders, reviews and wishlists
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything that can be decided without touching storage
//! (shipping fees, status transitions, address field validation) lives here.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, owners, statuses and contact fields
//! - [`shipping`] - Region-based shipping fee calculation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod shipping;
pub mod types;

pub use shipping::{ShippingZone, compute_shipping};
pub use types::*;
