use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded price for a product.
///
/// Observations are append-only and ordered by `recorded_at` ascending
/// within an ASIN; a written row is never mutated or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceObservation {
    pub asin: String,
    pub price: Decimal,
    pub recorded_at: NaiveDateTime,
}
