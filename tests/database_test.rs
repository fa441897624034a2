//! Repository tests against a live PostgreSQL instance.
//!
//! These are `#[ignore]`d so the default test run needs no database;
//! run them with `cargo test -- --ignored` and a `TEST_DATABASE_URL`.

mod helpers;

use chrono::{Duration, Utc};
use dealradar_backend::models::{ScrapedProduct, TrendFilter};
use dealradar_backend::repositories::PriceHistoryStore;
use dealradar_backend::services::{DealService, DiscountAnalyzer};
use helpers::TestDatabase;
use rust_decimal::Decimal;
use std::sync::Arc;

fn scraped(asin: &str, current: i64, list: i64) -> ScrapedProduct {
    ScrapedProduct {
        asin: asin.to_string(),
        title: format!("Test product {}", asin),
        current_price: Decimal::from(current),
        list_price: Decimal::from(list),
        image_url: None,
        product_url: format!("https://example.com/dp/{}", asin),
        category: "Electronics".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn test_price_history_round_trip() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let item = scraped("B0DBROUND", 30, 100);
    let now = Utc::now().naive_utc();
    db.product_repo
        .upsert(&item, item.discount_percent(), now)
        .await
        .unwrap();

    for (offset, price) in [(3i64, 40i64), (2, 42), (1, 39)] {
        db.price_history_repo
            .append(
                "B0DBROUND",
                Decimal::from(price),
                now - Duration::hours(offset),
            )
            .await
            .unwrap();
    }

    let window = db
        .price_history_repo
        .window("B0DBROUND", now - Duration::days(1))
        .await
        .unwrap();

    assert_eq!(window.len(), 3);
    assert_eq!(window[0].price, Decimal::from(40));
    assert_eq!(window[2].price, Decimal::from(39));

    let (previous, current) = db
        .price_history_repo
        .latest_two("B0DBROUND")
        .await
        .unwrap()
        .expect("two observations recorded");
    assert_eq!(previous.price, Decimal::from(42));
    assert_eq!(current.price, Decimal::from(39));
}

#[tokio::test]
#[ignore]
async fn test_upsert_preserves_first_seen() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let first_scrape = Utc::now().naive_utc() - Duration::hours(5);
    let created = db
        .product_repo
        .upsert(&scraped("B0DBUPSERT", 50, 200), 75, first_scrape)
        .await
        .unwrap();

    let second_scrape = Utc::now().naive_utc();
    let updated = db
        .product_repo
        .upsert(&scraped("B0DBUPSERT", 45, 200), 78, second_scrape)
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.first_seen, created.first_seen);
    assert!(updated.last_updated > created.last_updated);
    assert_eq!(updated.current_price, Decimal::from(45));
    assert_eq!(updated.discount_percent, 78);

    let stored = db
        .product_repo
        .find_by_asin("B0DBUPSERT")
        .await
        .unwrap()
        .expect("product persisted");
    assert_eq!(stored.current_price, Decimal::from(45));

    assert!(db
        .product_repo
        .find_by_asin("B0MISSING")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_find_deals_filters_by_discount_and_category() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let now = Utc::now().naive_utc();
    for (asin, current, list) in [("B0DEAL1", 20i64, 100i64), ("B0DEAL2", 60, 100)] {
        let item = scraped(asin, current, list);
        db.product_repo
            .upsert(&item, item.discount_percent(), now)
            .await
            .unwrap();
    }

    let deals = db.product_repo.find_deals(70, None).await.unwrap();
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0].asin, "B0DEAL1");

    let deals = db
        .product_repo
        .find_deals(70, Some("Toys"))
        .await
        .unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_trending_products_sees_decreasing_prices() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let now = Utc::now().naive_utc();
    let item = scraped("B0TREND", 50, 200);
    db.product_repo
        .upsert(&item, item.discount_percent(), now)
        .await
        .unwrap();

    // Steadily falling prices over the last few days
    for (days_ago, price) in [(4i64, 100i64), (3, 90), (2, 70), (1, 50)] {
        db.price_history_repo
            .append("B0TREND", Decimal::from(price), now - Duration::days(days_ago))
            .await
            .unwrap();
    }

    let analyzer = Arc::new(DiscountAnalyzer::new(db.price_history_repo.clone()));
    let deals = DealService::new(
        db.product_repo.clone(),
        db.price_history_repo.clone(),
        analyzer,
    );

    let trending = deals
        .trending_products(TrendFilter::Decreasing, 7)
        .await
        .unwrap();

    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0].product.asin, "B0TREND");
}

#[tokio::test]
#[ignore]
async fn test_device_preferences_upsert() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let now = Utc::now().naive_utc();
    let categories = serde_json::json!(["Electronics"]);

    db.preference_repo
        .upsert(
            "device-1",
            70,
            &categories,
            Decimal::from(10),
            Decimal::from(5000),
            now,
        )
        .await
        .unwrap();

    let updated = db
        .preference_repo
        .upsert(
            "device-1",
            80,
            &categories,
            Decimal::from(20),
            Decimal::from(5000),
            now,
        )
        .await
        .unwrap();

    assert_eq!(updated.min_discount, 80);
    assert_eq!(updated.min_price, Decimal::from(20));

    let tokens = db.preference_repo.all_tokens().await.unwrap();
    assert_eq!(tokens, vec!["device-1".to_string()]);
}
