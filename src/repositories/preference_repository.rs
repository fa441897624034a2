use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::RepositoryError;
use crate::models::DevicePreferences;

/// Repository for device registration and alert preferences
pub struct PreferenceRepository {
    pool: PgPool,
}

impl PreferenceRepository {
    /// Create a new PreferenceRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a device token, or update its preferences if already known
    pub async fn upsert(
        &self,
        device_token: &str,
        min_discount: i32,
        categories: &Value,
        min_price: Decimal,
        max_price: Decimal,
        now: NaiveDateTime,
    ) -> Result<DevicePreferences, RepositoryError> {
        let prefs = sqlx::query_as::<_, DevicePreferences>(
            r#"
            INSERT INTO device_preferences
                (device_token, min_discount, categories, min_price, max_price,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (device_token) DO UPDATE SET
                min_discount = EXCLUDED.min_discount,
                categories = EXCLUDED.categories,
                min_price = EXCLUDED.min_price,
                max_price = EXCLUDED.max_price,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(device_token)
        .bind(min_discount)
        .bind(categories)
        .bind(min_price)
        .bind(max_price)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(prefs)
    }

    /// All registered devices with their preferences
    pub async fn all(&self) -> Result<Vec<DevicePreferences>, RepositoryError> {
        let prefs = sqlx::query_as::<_, DevicePreferences>(
            "SELECT * FROM device_preferences ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(prefs)
    }

    /// All registered device tokens
    pub async fn all_tokens(&self) -> Result<Vec<String>, RepositoryError> {
        let tokens = sqlx::query_scalar::<_, String>("SELECT device_token FROM device_preferences")
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }
}
