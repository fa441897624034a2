pub mod alert_service;
pub mod deal_service;
pub mod discount_analyzer;
pub mod ingestion;

pub use alert_service::{AlertService, DealAlert};
pub use deal_service::{DealService, PriceStatistics};
pub use discount_analyzer::{
    analyze_pattern, fake_discount_check, select_trending, DiscountAnalyzer, DiscountVerdict,
};
pub use ingestion::{IngestRun, IngestService, IngestSummary};
