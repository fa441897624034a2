use crate::error::AppResult;
use crate::models::{Product, TrendFilter, TrendingProduct};
use crate::repositories::{PriceHistoryRepository, ProductRepository};
use crate::services::discount_analyzer::select_trending;
use crate::services::DiscountAnalyzer;
use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Discount floor for a newly seen product to count as a deal
const NEW_DEAL_MIN_DISCOUNT: i32 = 70;

/// Broad discount floor used when scanning for trending products
const TRENDING_MIN_DISCOUNT: i32 = 50;

/// Aggregate statistics over the tracked catalog
#[derive(Debug, Clone, Serialize)]
pub struct PriceStatistics {
    pub total_price_records: i64,
    pub recent_price_records: i64,
    pub average_discount: Decimal,
    pub max_discount: i32,
    pub active_products: i64,
    pub generated_at: NaiveDateTime,
}

/// Listing-side consumer of the discount engine: deal queries filtered
/// through the bulk fake-discount check.
pub struct DealService {
    products: Arc<ProductRepository>,
    history: Arc<PriceHistoryRepository>,
    analyzer: Arc<DiscountAnalyzer>,
}

impl DealService {
    /// Create a new DealService
    pub fn new(
        products: Arc<ProductRepository>,
        history: Arc<PriceHistoryRepository>,
        analyzer: Arc<DiscountAnalyzer>,
    ) -> Self {
        Self {
            products,
            history,
            analyzer,
        }
    }

    /// Deals at or above a discount threshold, with fake discounts
    /// filtered out
    pub async fn big_deals(
        &self,
        min_discount: i32,
        category: Option<&str>,
    ) -> AppResult<Vec<Product>> {
        let candidates = self.products.find_deals(min_discount, category).await?;
        Ok(self.filter_fake(candidates).await)
    }

    /// Deals first seen within the trailing window, fake discounts
    /// filtered out
    pub async fn new_deals(&self, window_hours: i64) -> AppResult<Vec<Product>> {
        let since = Utc::now().naive_utc() - Duration::hours(window_hours);
        let candidates = self
            .products
            .find_first_seen_since(since, NEW_DEAL_MIN_DISCOUNT)
            .await?;
        Ok(self.filter_fake(candidates).await)
    }

    /// Drop candidates the bulk filter flags. A product whose check fails
    /// with a storage error is unanalyzable this cycle and is dropped too;
    /// the batch itself carries on.
    async fn filter_fake(&self, candidates: Vec<Product>) -> Vec<Product> {
        let mut real = Vec::with_capacity(candidates.len());

        for product in candidates {
            match self.analyzer.is_fake_discount(&product).await {
                Ok(false) => real.push(product),
                Ok(true) => debug!("Filtered fake discount: {}", product.asin),
                Err(e) => {
                    warn!(
                        "Fake-discount check failed for {}, dropping this cycle: {}",
                        product.asin, e
                    );
                }
            }
        }

        real
    }

    /// Deals whose price window matches a trending filter, strongest first
    pub async fn trending_products(
        &self,
        filter: TrendFilter,
        days: i64,
    ) -> AppResult<Vec<TrendingProduct>> {
        let candidates = self.products.find_deals(TRENDING_MIN_DISCOUNT, None).await?;

        let mut analyzed = Vec::new();
        for product in candidates {
            match self.analyzer.analyze_asin(&product.asin, days).await {
                Ok(analysis) if analysis.is_analyzed() => analyzed.push((product, analysis)),
                Ok(_) => {}
                Err(e) => {
                    warn!("Trend analysis failed for {}: {}", product.asin, e);
                }
            }
        }

        Ok(select_trending(analyzed, filter))
    }

    /// Aggregate counts and discount statistics for health reporting
    pub async fn price_statistics(&self) -> AppResult<PriceStatistics> {
        let now = Utc::now().naive_utc();

        let total_price_records = self.history.count_all().await?;
        let recent_price_records = self.history.count_since(now - Duration::hours(24)).await?;
        let (average_discount, max_discount) = self.products.discount_stats().await?;
        let active_products = self.products.count_all().await?;

        Ok(PriceStatistics {
            total_price_records,
            recent_price_records,
            average_discount: average_discount.unwrap_or(Decimal::ZERO).round_dp(2),
            max_discount: max_discount.unwrap_or(0),
            active_products,
            generated_at: now,
        })
    }
}
