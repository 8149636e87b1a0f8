//! Cart aggregate.
//!
//! A cart is the pre-purchase selection of one [`CartOwner`]. It holds at most
//! one line per product, in the order products were first added, and every
//! line has a quantity of at least one. Stock is deliberately not consulted
//! here: a cart may hold more than is available, and availability is checked
//! at checkout review and again at order placement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{CartOwner, ProductId};

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Errors raised by cart line mutations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CartLineError {
    /// Quantity outside `1..=MAX_LINE_QUANTITY`.
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY} (got {0})")]
    InvalidQuantity(u64),
    /// No line exists for the product.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),
}

/// One product in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart and its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub owner: CartOwner,
    pub items: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart for `owner`.
    #[must_use]
    pub const fn empty(owner: CartOwner) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    /// Add `quantity` units of a product, creating the line if needed.
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartLineError::InvalidQuantity` if `quantity` is zero or the
    /// resulting line would exceed [`MAX_LINE_QUANTITY`]. The cart is left
    /// unchanged on error.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<u32, CartLineError> {
        validate_quantity(u64::from(quantity))?;
        let current = self.line(product_id).map_or(0, |line| line.quantity);
        let merged = u64::from(current) + u64::from(quantity);
        validate_quantity(merged)?;
        let merged = u32::try_from(merged).map_err(|_| CartLineError::InvalidQuantity(merged))?;
        self.upsert(product_id, merged);
        Ok(merged)
    }

    /// Set a line's quantity directly.
    ///
    /// # Errors
    ///
    /// Returns `CartLineError::LineNotFound` if the product is not in the
    /// cart, or `CartLineError::InvalidQuantity` for zero or oversized
    /// quantities (callers remove lines explicitly instead of zeroing them).
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartLineError> {
        validate_quantity(u64::from(quantity))?;
        let line = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or(CartLineError::LineNotFound(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        self.items.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Fold another cart's lines into this one, adding quantities for
    /// products present in both (capped at [`MAX_LINE_QUANTITY`]).
    pub fn absorb(&mut self, other: &Self) {
        for line in &other.items {
            let current = self.line(line.product_id).map_or(0, |l| l.quantity);
            let merged = current.saturating_add(line.quantity).min(MAX_LINE_QUANTITY);
            self.upsert(line.product_id, merged);
        }
    }

    fn upsert(&mut self, product_id: ProductId, quantity: u32) {
        match self.items.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.items.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn validate_quantity(quantity: u64) -> Result<(), CartLineError> {
    if quantity == 0 || quantity > u64::from(MAX_LINE_QUANTITY) {
        return Err(CartLineError::InvalidQuantity(quantity));
    }
    Ok(())
}
