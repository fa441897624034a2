use crate::error::AppResult;
use crate::models::{
    AnalysisStatus, PriceAnalysis, PriceChangeReport, PriceObservation, PriceTrend, Product,
    TrendFilter, TrendingProduct,
};
use crate::repositories::PriceHistoryStore;
use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

/// Window used by the genuine-discount history check, in days
const GENUINE_CHECK_WINDOW_DAYS: i64 = 14;

/// Window used by the bulk fake-discount filter, in days
const FAKE_CHECK_WINDOW_DAYS: i64 = 7;

/// Discount floor for a listing to count as a deal worth alerting on
const MIN_GENUINE_DISCOUNT_PERCENT: i64 = 70;

/// Maximum number of products a trending query returns
const TRENDING_LIMIT: usize = 20;

/// Verdict on an advertised discount, with a human-readable reason
#[derive(Debug, Clone, Serialize)]
pub struct DiscountVerdict {
    pub genuine: bool,
    pub reason: String,
}

impl DiscountVerdict {
    fn genuine(reason: impl Into<String>) -> Self {
        Self {
            genuine: true,
            reason: reason.into(),
        }
    }

    fn fake(reason: impl Into<String>) -> Self {
        Self {
            genuine: false,
            reason: reason.into(),
        }
    }
}

/// Turns a product's raw price time series into a trust decision.
///
/// The analyzer is purely functional over its inputs: it reads a window
/// once and computes over that immutable local copy, keeping no state of
/// its own beyond the store it reads and writes through.
pub struct DiscountAnalyzer {
    history: Arc<dyn PriceHistoryStore>,
}

impl DiscountAnalyzer {
    /// Create a new DiscountAnalyzer
    pub fn new(history: Arc<dyn PriceHistoryStore>) -> Self {
        Self { history }
    }

    /// Analyze the trailing `days` window for an ASIN
    pub async fn analyze_asin(&self, asin: &str, days: i64) -> AppResult<PriceAnalysis> {
        let now = Utc::now().naive_utc();
        let series = self.history.window(asin, now - Duration::days(days)).await?;
        Ok(analyze_pattern(&series, now))
    }

    /// Decide whether an advertised (current, list) pair is a genuine
    /// discount.
    ///
    /// Sequential rule chain, short-circuiting on the first failing rule:
    /// cheap absolute checks run before anything that touches history, so
    /// implausible values never cost a store query. This is the strict
    /// check that gates user-facing alerts.
    pub async fn is_genuine_discount(
        &self,
        asin: &str,
        current_price: Decimal,
        list_price: Decimal,
    ) -> AppResult<DiscountVerdict> {
        if list_price <= current_price {
            return Ok(DiscountVerdict::fake("list price not above current price"));
        }

        let discount_percent = (list_price - current_price) * Decimal::ONE_HUNDRED / list_price;

        if discount_percent < Decimal::from(MIN_GENUINE_DISCOUNT_PERCENT) {
            return Ok(DiscountVerdict::fake(format!(
                "discount too small: {}%",
                discount_percent.round_dp(1)
            )));
        }

        if list_price > current_price * Decimal::from(4) {
            return Ok(DiscountVerdict::fake("list price implausibly inflated (>4x)"));
        }

        let analysis = self.analyze_asin(asin, GENUINE_CHECK_WINDOW_DAYS).await?;

        if analysis.status == AnalysisStatus::InsufficientData {
            // No history to contradict the listing
            return Ok(DiscountVerdict::genuine("new product - list price accepted"));
        }

        if analysis.suspicious_activity {
            return Ok(DiscountVerdict::fake("suspicious price activity detected"));
        }

        let min_price = analysis.min_price.unwrap_or(current_price);
        if current_price > min_price * Decimal::new(12, 1) {
            return Ok(DiscountVerdict::fake(
                "current price 20%+ above recent minimum",
            ));
        }

        let avg_price = analysis.avg_price.unwrap_or(current_price);
        if list_price < avg_price * Decimal::new(15, 1) {
            return Ok(DiscountVerdict::fake(
                "list price not sufficiently above historical average",
            ));
        }

        Ok(DiscountVerdict::genuine(format!(
            "verified discount: {}%",
            discount_percent.round_dp(1)
        )))
    }

    /// Looser, faster fake-discount filter used when listing deals in bulk.
    ///
    /// Deliberately thresholded differently from `is_genuine_discount`
    /// (1.2x jump vs 1.3x, 3x list inflation vs 4x): the two rule sets
    /// serve different call sites with different false-positive
    /// tolerances and are never derived from one another.
    pub async fn is_fake_discount(&self, product: &Product) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let window = self
            .history
            .window(&product.asin, now - Duration::days(FAKE_CHECK_WINDOW_DAYS))
            .await?;

        Ok(fake_discount_check(&window, Some(product)))
    }

    /// Append a new observation and report the change against the previous
    /// one. The first-ever observation reports zero change.
    pub async fn track_price_change(
        &self,
        asin: &str,
        new_price: Decimal,
    ) -> AppResult<PriceChangeReport> {
        let now = Utc::now().naive_utc();
        self.history.append(asin, new_price, now).await?;

        let report = match self.history.latest_two(asin).await? {
            Some((previous, current)) => {
                let price_change = (current.price - previous.price).round_dp(2);
                let price_change_percent = if previous.price > Decimal::ZERO {
                    ((current.price - previous.price) / previous.price * Decimal::ONE_HUNDRED)
                        .round_dp(2)
                } else {
                    Decimal::ZERO
                };

                PriceChangeReport {
                    asin: asin.to_string(),
                    previous_price: Some(previous.price),
                    current_price: current.price,
                    price_change,
                    price_change_percent,
                }
            }
            None => PriceChangeReport {
                asin: asin.to_string(),
                previous_price: None,
                current_price: new_price,
                price_change: Decimal::ZERO,
                price_change_percent: Decimal::ZERO,
            },
        };

        Ok(report)
    }
}

/// Analyze one product's price window.
///
/// Pure function over an already-fetched series; `now` anchors the
/// trailing-7-day spike check. A window shorter than two observations is
/// an expected case for new products and yields `InsufficientData`.
pub fn analyze_pattern(series: &[PriceObservation], now: NaiveDateTime) -> PriceAnalysis {
    if series.len() < 2 {
        return PriceAnalysis::insufficient_data();
    }

    let prices: Vec<Decimal> = series.iter().map(|o| o.price).collect();

    let price_changes = prices.windows(2).filter(|pair| pair[0] != pair[1]).count() as u32;

    // Overall trend from first vs. last price only; interior fluctuation
    // shows up in volatility instead.
    let first = prices[0];
    let last = prices[prices.len() - 1];
    let trend = if last > first * Decimal::new(11, 1) {
        PriceTrend::Increasing
    } else if last < first * Decimal::new(9, 1) {
        PriceTrend::Decreasing
    } else {
        PriceTrend::Stable
    };

    let volatility = coefficient_of_variation(&prices);
    let suspicious_activity = detect_suspicious_activity(series, now);

    let min_price = prices.iter().min().copied();
    let max_price = prices.iter().max().copied();
    let sum: Decimal = prices.iter().sum();
    let avg_price = (sum / Decimal::from(prices.len() as u64)).round_dp(2);

    PriceAnalysis {
        status: AnalysisStatus::Analyzed,
        price_changes,
        trend,
        volatility,
        suspicious_activity,
        min_price,
        max_price,
        avg_price: Some(avg_price),
        current_price: Some(last),
    }
}

/// Coefficient of variation (sample stdev / mean), rounded to 3 decimals
fn coefficient_of_variation(prices: &[Decimal]) -> f64 {
    let values: Vec<f64> = prices.iter().filter_map(|p| p.to_f64()).collect();
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let volatility = variance.sqrt() / mean;

    (volatility * 1000.0).round() / 1000.0
}

/// Price-manipulation heuristics over one window.
///
/// Fires on either a recent spike (an adjacent pair inside the trailing 7
/// days jumping by strictly more than 30%) or a pump-and-dump shape
/// anywhere in the window (a spike of at least 40% immediately followed
/// by a collapse to under half the peak). Needs at least three
/// observations to have anything to say.
fn detect_suspicious_activity(series: &[PriceObservation], now: NaiveDateTime) -> bool {
    if series.len() < 3 {
        return false;
    }

    let spike_ratio = Decimal::new(13, 1);
    let recent_cutoff = now - Duration::days(7);

    let recent: Vec<Decimal> = series
        .iter()
        .filter(|o| o.recorded_at >= recent_cutoff)
        .map(|o| o.price)
        .collect();

    if recent.len() >= 2 {
        for pair in recent.windows(2) {
            if pair[1] > pair[0] * spike_ratio {
                return true;
            }
        }
    }

    let pump_ratio = Decimal::new(14, 1);
    let dump_ratio = Decimal::new(5, 1);

    for triple in series.windows(3) {
        let prev = triple[0].price;
        let peak = triple[1].price;
        let curr = triple[2].price;

        if peak > prev * pump_ratio && curr < peak * dump_ratio {
            return true;
        }
    }

    false
}

/// The bulk fake-discount rule set, over an already-fetched 7-day window.
///
/// Fewer than two observations is not enough evidence to call a listing
/// fake; the stored list price is only consulted once history exists.
pub fn fake_discount_check(window: &[PriceObservation], product: Option<&Product>) -> bool {
    if window.len() < 2 {
        return false;
    }

    let jump_ratio = Decimal::new(12, 1);
    for pair in window.windows(2) {
        if pair[1].price > pair[0].price * jump_ratio {
            return true;
        }
    }

    if let Some(p) = product {
        if p.list_price > p.current_price * Decimal::from(3) {
            return true;
        }
    }

    false
}

/// Filter and rank analyzed deals by the requested trend shape
pub fn select_trending(
    candidates: Vec<(Product, PriceAnalysis)>,
    filter: TrendFilter,
) -> Vec<TrendingProduct> {
    let mut matched: Vec<TrendingProduct> = candidates
        .into_iter()
        .filter(|(_, analysis)| match filter {
            TrendFilter::Decreasing => analysis.trend == PriceTrend::Decreasing,
            TrendFilter::Increasing => analysis.trend == PriceTrend::Increasing,
            TrendFilter::Volatile => analysis.volatility > 0.1,
        })
        .map(|(product, analysis)| TrendingProduct { product, analysis })
        .collect();

    match filter {
        TrendFilter::Decreasing => {
            matched.sort_by(|a, b| a.analysis.min_price.cmp(&b.analysis.min_price));
        }
        TrendFilter::Increasing => {
            matched.sort_by(|a, b| b.analysis.max_price.cmp(&a.analysis.max_price));
        }
        TrendFilter::Volatile => {
            matched.sort_by(|a, b| {
                b.analysis
                    .volatility
                    .partial_cmp(&a.analysis.volatility)
                    .unwrap_or(Ordering::Equal)
            });
        }
    }

    matched.truncate(TRENDING_LIMIT);
    matched
}
