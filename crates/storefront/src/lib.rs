//! Bazaar Storefront library.
//!
//! HTTP API for carts, checkout, orders, reviews and wishlists. The binary
//! in `main.rs` wires configuration, tracing and Sentry around
//! [`routes::app`]; everything else lives here so it can be tested against
//! the in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
