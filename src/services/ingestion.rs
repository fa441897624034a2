use crate::error::AppResult;
use crate::models::{PriceChangeReport, ScrapedProduct};
use crate::repositories::ProductRepository;
use crate::services::DiscountAnalyzer;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Explicit per-run context for one ingestion batch.
///
/// Every batch carries its own run value; there is no shared mutable
/// scraper or session state between runs.
#[derive(Debug, Clone)]
pub struct IngestRun {
    pub id: Uuid,
    pub source: String,
    pub started_at: NaiveDateTime,
}

impl IngestRun {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            started_at: Utc::now().naive_utc(),
        }
    }
}

/// Counts for one completed ingestion batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub total: usize,
    pub ingested: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Keyed mutex registry guaranteeing at most one in-flight write path per
/// ASIN. Different ASINs proceed independently.
struct AsinLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AsinLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, asin: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        map.entry(asin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Validates scraped records at the boundary and writes them through to
/// the product table and the price history store.
pub struct IngestService {
    products: Arc<ProductRepository>,
    analyzer: Arc<DiscountAnalyzer>,
    locks: AsinLocks,
}

impl IngestService {
    /// Create a new IngestService
    pub fn new(products: Arc<ProductRepository>, analyzer: Arc<DiscountAnalyzer>) -> Self {
        Self {
            products,
            analyzer,
            locks: AsinLocks::new(),
        }
    }

    /// Ingest one batch of scraped records.
    ///
    /// Per-item failures are logged and counted, never fatal: the batch
    /// always makes forward progress past a bad record or a storage
    /// hiccup.
    pub async fn ingest_batch(&self, run: &IngestRun, items: Vec<ScrapedProduct>) -> IngestSummary {
        let mut summary = IngestSummary {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            if let Err(reason) = item.validate() {
                warn!("[{}] Rejected scraped record: {}", run.id, reason);
                summary.rejected += 1;
                continue;
            }

            match self.ingest_one(&item).await {
                Ok(report) => {
                    summary.ingested += 1;
                    if let Some(previous) = report.previous_price {
                        if report.price_change != rust_decimal::Decimal::ZERO {
                            debug!(
                                "[{}] {} price change: {} -> {} ({}%)",
                                run.id,
                                report.asin,
                                previous,
                                report.current_price,
                                report.price_change_percent
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!("[{}] Failed to ingest {}: {}", run.id, item.asin, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "[{}] Ingest from '{}' finished: {}/{} recorded ({} rejected, {} failed)",
            run.id, run.source, summary.ingested, summary.total, summary.rejected, summary.failed
        );

        summary
    }

    /// Upsert the product record and append the observed price, holding
    /// the ASIN's lock so no other evaluation of the same product can see
    /// a half-written before/after pair.
    async fn ingest_one(&self, item: &ScrapedProduct) -> AppResult<PriceChangeReport> {
        let lock = self.locks.get(&item.asin).await;
        let _guard = lock.lock().await;

        let now = Utc::now().naive_utc();
        self.products
            .upsert(item, item.discount_percent(), now)
            .await?;

        self.analyzer
            .track_price_change(&item.asin, item.current_price)
            .await
    }
}
