use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::RepositoryError;
use crate::models::PriceObservation;

/// Contract the discount engine consumes for price history access.
///
/// The store is an append-only per-product time series: observations are
/// never reordered or mutated once written, and reads return them ascending
/// by `recorded_at`. Any backing store preserving those two properties
/// satisfies the engine.
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    /// Record one observation for an ASIN
    async fn append(
        &self,
        asin: &str,
        price: Decimal,
        recorded_at: NaiveDateTime,
    ) -> Result<(), RepositoryError>;

    /// All observations with `recorded_at >= since`, ascending by time.
    /// An empty vector is a valid result, not an error.
    async fn window(
        &self,
        asin: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<PriceObservation>, RepositoryError>;

    /// The last two observations of a trailing 1-day window, oldest first.
    /// `None` when fewer than two exist there.
    async fn latest_two(
        &self,
        asin: &str,
    ) -> Result<Option<(PriceObservation, PriceObservation)>, RepositoryError>;
}

/// PostgreSQL-backed price history repository
pub struct PriceHistoryRepository {
    pool: PgPool,
}

impl PriceHistoryRepository {
    /// Create a new PriceHistoryRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete observations recorded before the cutoff, returning the count
    pub async fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM price_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Total number of stored observations
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_history")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Number of observations recorded at or after the given time
    pub async fn count_since(&self, since: NaiveDateTime) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_history WHERE recorded_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[async_trait]
impl PriceHistoryStore for PriceHistoryRepository {
    async fn append(
        &self,
        asin: &str,
        price: Decimal,
        recorded_at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO price_history (asin, price, recorded_at) VALUES ($1, $2, $3)")
            .bind(asin)
            .bind(price)
            .bind(recorded_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn window(
        &self,
        asin: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<PriceObservation>, RepositoryError> {
        let observations = sqlx::query_as::<_, PriceObservation>(
            r#"
            SELECT asin, price, recorded_at
            FROM price_history
            WHERE asin = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(asin)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(observations)
    }

    async fn latest_two(
        &self,
        asin: &str,
    ) -> Result<Option<(PriceObservation, PriceObservation)>, RepositoryError> {
        let since = Utc::now().naive_utc() - Duration::days(1);

        let mut rows = sqlx::query_as::<_, PriceObservation>(
            r#"
            SELECT asin, price, recorded_at
            FROM price_history
            WHERE asin = $1 AND recorded_at >= $2
            ORDER BY recorded_at DESC
            LIMIT 2
            "#,
        )
        .bind(asin)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        if rows.len() < 2 {
            return Ok(None);
        }

        let current = rows.remove(0);
        let previous = rows.remove(0);
        Ok(Some((previous, current)))
    }
}
