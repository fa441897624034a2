use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product model representing one tracked listing
///
/// Re-scrapes overwrite the mutable fields and bump `last_updated`;
/// `first_seen` is set once at creation and never changed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i32,
    pub asin: String,
    pub title: String,
    pub current_price: Decimal,
    pub list_price: Decimal,
    pub discount_percent: i32,
    pub image_url: Option<String>,
    pub product_url: String,
    pub category: String,
    pub first_seen: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

/// A product record as handed over by a scrape run.
///
/// This is the ingestion-boundary shape: whatever the scraper saw, before
/// validation. The stored discount percent is always recomputed here rather
/// than trusted from the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub asin: String,
    pub title: String,
    pub current_price: Decimal,
    pub list_price: Decimal,
    pub image_url: Option<String>,
    pub product_url: String,
    pub category: String,
}

impl ScrapedProduct {
    /// Validate the record at the ingestion boundary.
    ///
    /// Malformed input (empty identifiers, non-positive prices) is rejected
    /// here; the analyzer assumes every price it sees is a positive decimal.
    pub fn validate(&self) -> Result<(), String> {
        if self.asin.trim().is_empty() {
            return Err("ASIN must not be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err(format!("{}: title must not be empty", self.asin));
        }

        if self.current_price <= Decimal::ZERO {
            return Err(format!(
                "{}: current price must be positive, got {}",
                self.asin, self.current_price
            ));
        }

        if self.list_price <= Decimal::ZERO {
            return Err(format!(
                "{}: list price must be positive, got {}",
                self.asin, self.list_price
            ));
        }

        if self.product_url.trim().is_empty() {
            return Err(format!("{}: product URL must not be empty", self.asin));
        }

        Ok(())
    }

    /// Discount percent for storage: `round(100 * (list - current) / list)`.
    ///
    /// Zero when the list price does not exceed the current price, which
    /// keeps such listings out of every deal set.
    pub fn discount_percent(&self) -> i32 {
        if self.list_price > self.current_price && self.list_price > Decimal::ZERO {
            let percent =
                (self.list_price - self.current_price) * Decimal::from(100) / self.list_price;
            percent.round().to_i32().unwrap_or(0)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped(current: Decimal, list: Decimal) -> ScrapedProduct {
        ScrapedProduct {
            asin: "B000TEST01".to_string(),
            title: "Test product".to_string(),
            current_price: current,
            list_price: list,
            image_url: None,
            product_url: "https://example.com/dp/B000TEST01".to_string(),
            category: "Electronics".to_string(),
        }
    }

    #[test]
    fn test_discount_percent_rounding() {
        let p = scraped(Decimal::new(30, 0), Decimal::new(100, 0));
        assert_eq!(p.discount_percent(), 70);

        let p = scraped(Decimal::new(3333, 2), Decimal::new(100, 0));
        assert_eq!(p.discount_percent(), 67);
    }

    #[test]
    fn test_discount_percent_zero_when_not_discounted() {
        let p = scraped(Decimal::new(100, 0), Decimal::new(100, 0));
        assert_eq!(p.discount_percent(), 0);

        let p = scraped(Decimal::new(120, 0), Decimal::new(100, 0));
        assert_eq!(p.discount_percent(), 0);
    }

    #[test]
    fn test_validate_rejects_non_positive_prices() {
        let p = scraped(Decimal::ZERO, Decimal::new(100, 0));
        assert!(p.validate().is_err());

        let p = scraped(Decimal::new(-5, 0), Decimal::new(100, 0));
        assert!(p.validate().is_err());

        let p = scraped(Decimal::new(30, 0), Decimal::new(100, 0));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_asin() {
        let mut p = scraped(Decimal::new(30, 0), Decimal::new(100, 0));
        p.asin = "  ".to_string();
        assert!(p.validate().is_err());
    }
}
