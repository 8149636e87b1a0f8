//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod order_code;
pub mod owner;
pub mod price;
pub mod status;

pub use contact::{Phone, PhoneError, Pincode, PincodeError};
pub use id::*;
pub use order_code::OrderCode;
pub use owner::CartOwner;
pub use price::{CurrencyCode, Price};
pub use status::*;
