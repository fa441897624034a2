use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::RepositoryError;
use crate::models::{Product, ScrapedProduct};

/// Repository for product data access
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new ProductRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product or update it in place on re-scrape.
    ///
    /// `first_seen` is written once at creation; updates overwrite the
    /// scraped fields and bump `last_updated` only.
    pub async fn upsert(
        &self,
        item: &ScrapedProduct,
        discount_percent: i32,
        now: NaiveDateTime,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (asin, title, current_price, list_price, discount_percent,
                 image_url, product_url, category, first_seen, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (asin) DO UPDATE SET
                title = EXCLUDED.title,
                current_price = EXCLUDED.current_price,
                list_price = EXCLUDED.list_price,
                discount_percent = EXCLUDED.discount_percent,
                image_url = EXCLUDED.image_url,
                product_url = EXCLUDED.product_url,
                category = EXCLUDED.category,
                last_updated = EXCLUDED.last_updated
            RETURNING *
            "#,
        )
        .bind(&item.asin)
        .bind(&item.title)
        .bind(item.current_price)
        .bind(item.list_price)
        .bind(discount_percent)
        .bind(&item.image_url)
        .bind(&item.product_url)
        .bind(&item.category)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    /// Find a product by ASIN
    pub async fn find_by_asin(&self, asin: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE asin = $1")
            .bind(asin)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Products at or above a discount threshold, best discounts first
    pub async fn find_deals(
        &self,
        min_discount: i32,
        category: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE discount_percent >= $1
              AND ($2::text IS NULL OR category = $2)
            ORDER BY discount_percent DESC, last_updated DESC
            "#,
        )
        .bind(min_discount)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Deals first seen at or after the given time
    pub async fn find_first_seen_since(
        &self,
        since: NaiveDateTime,
        min_discount: i32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE first_seen >= $1 AND discount_percent >= $2
            ORDER BY discount_percent DESC
            "#,
        )
        .bind(since)
        .bind(min_discount)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products whose record was updated at or after the given time
    pub async fn find_updated_since(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE last_updated >= $1
            ORDER BY last_updated DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Delete products not updated since the cutoff, returning the count
    pub async fn delete_stale(&self, cutoff: NaiveDateTime) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE last_updated < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of tracked products
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Average and maximum discount percent across all products
    pub async fn discount_stats(&self) -> Result<(Option<Decimal>, Option<i32>), RepositoryError> {
        let stats = sqlx::query_as::<_, (Option<Decimal>, Option<i32>)>(
            "SELECT AVG(discount_percent), MAX(discount_percent) FROM products",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
