use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Per-device alert preferences, keyed by push token
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DevicePreferences {
    pub id: i32,
    pub device_token: String,
    pub min_discount: i32,
    pub categories: Value, // JSONB stored as serde_json::Value
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DevicePreferences {
    /// Get preferred categories as a vector of strings
    pub fn categories_vec(&self) -> Vec<String> {
        match &self.categories {
            Value::Array(arr) => arr
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => vec![],
        }
    }

    /// Whether a price falls inside the device's preferred band
    pub fn price_in_range(&self, price: Decimal) -> bool {
        price >= self.min_price && price <= self.max_price
    }
}
