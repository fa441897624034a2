use crate::error::AppResult;
use crate::models::{DevicePreferences, Product};
use crate::notifier::PushNotifier;
use crate::repositories::{PreferenceRepository, PriceHistoryStore, ProductRepository};
use crate::services::{DealService, DiscountAnalyzer};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// At most this many deals go into one new-deal broadcast
const NEW_DEAL_BROADCAST_LIMIT: usize = 5;

/// At most this many alerts go into one per-device digest
const DIGEST_LIMIT: usize = 5;

/// At most this many price drops are announced per tracking cycle
const PRICE_DROP_LIMIT: usize = 3;

/// A genuine deal matched to a device's preferences, with the verdict
/// reason the rule chain produced
#[derive(Debug, Clone, Serialize)]
pub struct DealAlert {
    pub product: Product,
    pub reason: String,
}

/// Decides which products are worth an alert and pushes them out.
///
/// Two distinct gates feed this service by design: the strict
/// `is_genuine_discount` chain guards per-device alerts, while the looser
/// bulk filter inside `DealService` guards broadcast listings.
pub struct AlertService {
    products: Arc<ProductRepository>,
    preferences: Arc<PreferenceRepository>,
    history: Arc<dyn PriceHistoryStore>,
    analyzer: Arc<DiscountAnalyzer>,
    deals: Arc<DealService>,
    notifier: Arc<PushNotifier>,
}

impl AlertService {
    /// Create a new AlertService
    pub fn new(
        products: Arc<ProductRepository>,
        preferences: Arc<PreferenceRepository>,
        history: Arc<dyn PriceHistoryStore>,
        analyzer: Arc<DiscountAnalyzer>,
        deals: Arc<DealService>,
        notifier: Arc<PushNotifier>,
    ) -> Self {
        Self {
            products,
            preferences,
            history,
            analyzer,
            deals,
            notifier,
        }
    }

    /// Genuine-discount alerts matching one device's preferences.
    ///
    /// Every candidate passes through the strict rule chain; the verdict
    /// reason travels with the alert so the client can show why a deal
    /// was trusted.
    pub async fn alerts_for(&self, prefs: &DevicePreferences) -> AppResult<Vec<DealAlert>> {
        let mut alerts = Vec::new();

        for category in prefs.categories_vec() {
            let deals = self
                .deals
                .big_deals(prefs.min_discount, Some(category.as_str()))
                .await?;

            for deal in deals {
                if !prefs.price_in_range(deal.current_price) {
                    continue;
                }

                match self
                    .analyzer
                    .is_genuine_discount(&deal.asin, deal.current_price, deal.list_price)
                    .await
                {
                    Ok(verdict) if verdict.genuine => {
                        alerts.push(DealAlert {
                            product: deal,
                            reason: verdict.reason,
                        });
                    }
                    Ok(verdict) => {
                        debug!("Suppressed alert for {}: {}", deal.asin, verdict.reason);
                    }
                    Err(e) => {
                        warn!(
                            "Genuine-discount check failed for {}, skipping: {}",
                            deal.asin, e
                        );
                    }
                }
            }
        }

        Ok(alerts)
    }

    /// Job body: per-device digest of verified deals
    pub async fn send_preference_digests(&self) -> AppResult<()> {
        let devices = self.preferences.all().await?;

        if devices.is_empty() {
            debug!("No registered devices, skipping digest");
            return Ok(());
        }

        for device in devices {
            let mut alerts = match self.alerts_for(&device).await {
                Ok(alerts) => alerts,
                Err(e) => {
                    warn!("Digest failed for device {}: {}", device.device_token, e);
                    continue;
                }
            };

            if alerts.is_empty() {
                continue;
            }

            alerts.sort_by(|a, b| b.product.discount_percent.cmp(&a.product.discount_percent));
            alerts.truncate(DIGEST_LIMIT);

            let payloads: Vec<Value> = alerts
                .iter()
                .map(|alert| self.notifier.deal_payload(&alert.product, Some(&alert.reason)))
                .collect();

            let tokens = vec![device.device_token.clone()];
            let report = self.notifier.send_bulk(&tokens, &payloads).await;

            info!(
                "Digest for device {}: {} sent, {} failed",
                device.device_token, report.sent, report.failed
            );
        }

        Ok(())
    }

    /// Job body: broadcast the best newly found deals to every device
    pub async fn notify_new_deals(&self, window_hours: i64) -> AppResult<()> {
        let mut deals = self.deals.new_deals(window_hours).await?;

        if deals.is_empty() {
            info!("No new deals in the last {}h", window_hours);
            return Ok(());
        }

        deals.sort_by(|a, b| b.discount_percent.cmp(&a.discount_percent));
        deals.truncate(NEW_DEAL_BROADCAST_LIMIT);

        let tokens = self.preferences.all_tokens().await?;
        if tokens.is_empty() {
            debug!("No registered devices, skipping new-deal broadcast");
            return Ok(());
        }

        let payloads: Vec<Value> = deals
            .iter()
            .map(|deal| self.notifier.deal_payload(deal, None))
            .collect();

        let report = self.notifier.send_bulk(&tokens, &payloads).await;
        info!(
            "New-deal broadcast: {} deals, {} notifications sent, {} failed",
            deals.len(),
            report.sent,
            report.failed
        );

        Ok(())
    }

    /// Job body: announce significant drops among recently updated
    /// products.
    ///
    /// A drop is significant when the latest observation undercuts the
    /// previous one by more than 10%; the largest relative drops win.
    pub async fn notify_price_drops(&self, window_hours: i64) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        let updated = self
            .products
            .find_updated_since(now - Duration::hours(window_hours))
            .await?;

        let mut drops: Vec<(Product, Decimal)> = Vec::new();

        for product in updated {
            let window = match self
                .history
                .window(&product.asin, now - Duration::days(2))
                .await
            {
                Ok(window) => window,
                Err(e) => {
                    warn!("Price window failed for {}, skipping: {}", product.asin, e);
                    continue;
                }
            };

            if window.len() < 2 {
                continue;
            }

            let previous = window[window.len() - 2].price;
            if previous > Decimal::ZERO && product.current_price < previous * Decimal::new(9, 1) {
                drops.push((product, previous));
            }
        }

        if drops.is_empty() {
            info!("No significant price drops found");
            return Ok(());
        }

        drops.sort_by(|a, b| {
            let rel_a = (a.1 - a.0.current_price) / a.1;
            let rel_b = (b.1 - b.0.current_price) / b.1;
            rel_b.cmp(&rel_a)
        });
        drops.truncate(PRICE_DROP_LIMIT);

        let tokens = self.preferences.all_tokens().await?;
        if tokens.is_empty() {
            debug!("No registered devices, skipping price-drop broadcast");
            return Ok(());
        }

        let payloads: Vec<Value> = drops
            .iter()
            .map(|(product, old_price)| self.notifier.price_drop_payload(product, *old_price))
            .collect();

        let report = self.notifier.send_bulk(&tokens, &payloads).await;
        info!(
            "Price-drop broadcast: {} drops, {} notifications sent, {} failed",
            drops.len(),
            report.sent,
            report.failed
        );

        Ok(())
    }
}
