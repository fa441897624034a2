use crate::config::PushConfig;
use crate::error::{AppError, AppResult};
use crate::models::Product;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Maximum product title length inside a notification body
const TITLE_LIMIT: usize = 40;

/// Outcome of a bulk delivery
#[derive(Debug, Clone, Default)]
pub struct NotificationReport {
    pub sent: usize,
    pub failed: usize,
}

/// Builds alert payloads and delivers them to registered devices through
/// an HTTPS push gateway.
///
/// Transport details past the gateway are not this service's concern.
/// When no gateway is configured the notifier stays inert: payloads are
/// logged and dropped instead of delivered.
pub struct PushNotifier {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    /// Create a new PushNotifier
    pub fn new(config: PushConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build push client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Whether a push gateway has been configured
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Payload for a verified deal alert
    pub fn deal_payload(&self, product: &Product, reason: Option<&str>) -> Value {
        let body = format!(
            "{}% off: {}",
            product.discount_percent,
            truncate_title(&product.title)
        );
        let subtitle = format!("{} (was {})", product.current_price, product.list_price);

        let mut data = json!({
            "asin": product.asin,
            "product_url": product.product_url,
            "current_price": product.current_price,
            "list_price": product.list_price,
            "discount_percent": product.discount_percent,
            "category": product.category,
            "image_url": product.image_url.clone().unwrap_or_default(),
            "notification_type": "deal_alert",
            "timestamp": Utc::now().naive_utc().to_string(),
        });

        if let Some(reason) = reason {
            data["reason"] = json!(reason);
        }

        json!({
            "aps": {
                "alert": {
                    "title": "Hot deal found!",
                    "subtitle": subtitle,
                    "body": body,
                },
                "sound": "default",
                "badge": 1,
                "category": "DEAL_CATEGORY",
                "thread-id": "dealradar-deals",
            },
            "data": data,
        })
    }

    /// Payload for a price-drop alert
    pub fn price_drop_payload(&self, product: &Product, old_price: Decimal) -> Value {
        let drop = (old_price - product.current_price).round_dp(2);
        let drop_percent = if old_price > Decimal::ZERO {
            (drop / old_price * Decimal::ONE_HUNDRED).round_dp(1)
        } else {
            Decimal::ZERO
        };

        let body = format!("{} dropped by {}", truncate_title(&product.title), drop);
        let subtitle = format!("{} (-{}%)", product.current_price, drop_percent);

        json!({
            "aps": {
                "alert": {
                    "title": "Price dropped!",
                    "subtitle": subtitle,
                    "body": body,
                },
                "sound": "default",
                "badge": 1,
                "category": "PRICE_DROP_CATEGORY",
                "thread-id": "dealradar-deals",
            },
            "data": {
                "asin": product.asin,
                "product_url": product.product_url,
                "current_price": product.current_price,
                "old_price": old_price,
                "category": product.category,
                "image_url": product.image_url.clone().unwrap_or_default(),
                "notification_type": "price_drop",
                "timestamp": Utc::now().naive_utc().to_string(),
            },
        })
    }

    /// Deliver one payload to one device
    pub async fn send(&self, device_token: &str, payload: &Value) -> AppResult<()> {
        let gateway = match &self.config.gateway_url {
            Some(url) => url,
            None => {
                debug!(
                    "Push gateway not configured, dropping notification for {}",
                    device_token
                );
                return Ok(());
            }
        };

        let mut request = self.client.post(gateway).json(&json!({
            "device_token": device_token,
            "payload": payload,
        }));

        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Push request failed: {}", e)))?;

        response
            .error_for_status()
            .map_err(|e| AppError::Notification(format!("Push gateway rejected: {}", e)))?;

        Ok(())
    }

    /// Deliver a set of payloads to a set of devices, counting outcomes.
    /// Individual failures are logged and never abort the rest.
    pub async fn send_bulk(&self, tokens: &[String], payloads: &[Value]) -> NotificationReport {
        let mut report = NotificationReport::default();

        for token in tokens {
            for payload in payloads {
                match self.send(token, payload).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        warn!("Notification to {} failed: {}", token, e);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Shorten a product title for notification bodies
fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_LIMIT {
        title.to_string()
    } else {
        let short: String = title.chars().take(TITLE_LIMIT - 3).collect();
        format!("{}...", short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product() -> Product {
        Product {
            id: 1,
            asin: "B000TEST01".to_string(),
            title: "Wireless Headphones".to_string(),
            current_price: Decimal::new(2999, 2),
            list_price: Decimal::new(9999, 2),
            discount_percent: 70,
            image_url: None,
            product_url: "https://example.com/dp/B000TEST01".to_string(),
            category: "Electronics".to_string(),
            first_seen: Utc::now().naive_utc(),
            last_updated: Utc::now().naive_utc(),
        }
    }

    fn notifier() -> PushNotifier {
        PushNotifier::new(PushConfig::default()).unwrap()
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short"), "short");

        let long = "a".repeat(60);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), TITLE_LIMIT);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_deal_payload_shape() {
        let payload = notifier().deal_payload(&product(), Some("verified discount: 70.0%"));

        assert_eq!(payload["aps"]["alert"]["title"], "Hot deal found!");
        assert_eq!(payload["aps"]["category"], "DEAL_CATEGORY");
        assert_eq!(payload["data"]["asin"], "B000TEST01");
        assert_eq!(payload["data"]["notification_type"], "deal_alert");
        assert_eq!(payload["data"]["reason"], "verified discount: 70.0%");
        assert_eq!(
            payload["aps"]["alert"]["body"],
            "70% off: Wireless Headphones"
        );
    }

    #[test]
    fn test_price_drop_payload_shape() {
        let payload = notifier().price_drop_payload(&product(), Decimal::new(3999, 2));

        assert_eq!(payload["aps"]["alert"]["title"], "Price dropped!");
        assert_eq!(payload["data"]["notification_type"], "price_drop");
        // 39.99 -> 29.99 is a 10.00 drop of 25.0%
        assert_eq!(payload["aps"]["alert"]["subtitle"], "29.99 (-25.0%)");
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_is_inert() {
        let n = notifier();
        assert!(!n.is_configured());

        let payload = n.deal_payload(&product(), None);
        assert!(n.send("token-1", &payload).await.is_ok());

        let report = n
            .send_bulk(&["token-1".to_string()], &[payload])
            .await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);
    }
}
