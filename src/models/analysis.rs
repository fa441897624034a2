use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Product;

/// Outcome of a pattern analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Fewer than two observations in the window. Expected for new
    /// products, not an error.
    InsufficientData,
    Analyzed,
}

/// Overall direction of a price window, judged on first vs. last price only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Unknown,
    Stable,
    Increasing,
    Decreasing,
}

impl PriceTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTrend::Unknown => "unknown",
            PriceTrend::Stable => "stable",
            PriceTrend::Increasing => "increasing",
            PriceTrend::Decreasing => "decreasing",
        }
    }
}

/// Derived statistics over one product's price window.
///
/// Computed on demand from a window of observations; never persisted.
/// The price aggregates are only present when `status` is `Analyzed`.
#[derive(Debug, Clone, Serialize)]
pub struct PriceAnalysis {
    pub status: AnalysisStatus,
    pub price_changes: u32,
    pub trend: PriceTrend,
    /// Coefficient of variation (sample stdev / mean), dimensionless
    pub volatility: f64,
    pub suspicious_activity: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
}

impl PriceAnalysis {
    /// The result for a window too short to analyze
    pub fn insufficient_data() -> Self {
        Self {
            status: AnalysisStatus::InsufficientData,
            price_changes: 0,
            trend: PriceTrend::Unknown,
            volatility: 0.0,
            suspicious_activity: false,
            min_price: None,
            max_price: None,
            avg_price: None,
            current_price: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status == AnalysisStatus::Analyzed
    }
}

/// Result of recording one new price observation
///
/// Returned only when the append succeeded; a storage failure surfaces as
/// an error instead. `previous_price` is `None` for the first observation
/// of a product, in which case the change is zero.
#[derive(Debug, Clone, Serialize)]
pub struct PriceChangeReport {
    pub asin: String,
    pub previous_price: Option<Decimal>,
    pub current_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
}

/// Which kind of price movement a trending query selects for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendFilter {
    Decreasing,
    Increasing,
    Volatile,
}

/// A deal whose price window matched a trending filter
#[derive(Debug, Clone, Serialize)]
pub struct TrendingProduct {
    pub product: Product,
    pub analysis: PriceAnalysis,
}
