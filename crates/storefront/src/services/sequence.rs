//! Sequence generator.

use std::sync::Arc;

use tracing::instrument;

use bazaar_core::OrderCode;

use crate::db::{RepositoryError, SequenceStore};

/// Counter name used for order codes.
pub const ORDER_SEQUENCE: &str = "order";

/// Issues strictly increasing integers per counter name.
///
/// All atomicity lives in the backing [`SequenceStore`]; this type never
/// reads a value and writes it back.
#[derive(Clone)]
pub struct SequenceGenerator {
    store: Arc<dyn SequenceStore>,
}

impl SequenceGenerator {
    #[must_use]
    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self { store }
    }

    /// Next value of the named counter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn next(&self, name: &str) -> Result<i64, RepositoryError> {
        self.store.next(name).await
    }

    /// Last value issued for the named counter (0 if never used).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn current(&self, name: &str) -> Result<i64, RepositoryError> {
        self.store.current(name).await
    }

    /// Allocate the next order code (`ORD1`, `ORD2`, ...).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    #[instrument(skip(self))]
    pub async fn next_order_code(&self) -> Result<OrderCode, RepositoryError> {
        let seq = self.next(ORDER_SEQUENCE).await?;
        Ok(OrderCode::from_sequence(seq))
    }
}
