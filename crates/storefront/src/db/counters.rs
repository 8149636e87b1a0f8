//! Named sequence counters.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepositoryError, SequenceStore};

/// Repository for `shop.counter`.
#[derive(Clone)]
pub struct CounterRepository {
    pool: PgPool,
}

impl CounterRepository {
    /// Create a new counter repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for CounterRepository {
    async fn next(&self, name: &str) -> Result<i64, RepositoryError> {
        // Single statement: the row lock taken by the upsert serializes
        // concurrent callers, so no two see the same value.
        let (seq,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO shop.counter (name, seq)
            VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET seq = shop.counter.seq + 1
            RETURNING seq
            ",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }

    async fn current(&self, name: &str) -> Result<i64, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT seq FROM shop.counter WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map_or(0, |(seq,)| seq))
    }
}
