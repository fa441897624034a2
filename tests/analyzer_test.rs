mod helpers;

use dealradar_backend::models::AnalysisStatus;
use dealradar_backend::repositories::PriceHistoryStore;
use dealradar_backend::services::DiscountAnalyzer;
use helpers::{product, InMemoryPriceHistory};
use rust_decimal::Decimal;
use std::sync::Arc;

fn setup() -> (Arc<InMemoryPriceHistory>, DiscountAnalyzer) {
    let store = Arc::new(InMemoryPriceHistory::new());
    let analyzer = DiscountAnalyzer::new(store.clone());
    (store, analyzer)
}

#[tokio::test]
async fn test_no_history_is_insufficient_data() {
    let (_store, analyzer) = setup();

    let analysis = analyzer.analyze_asin("B0EMPTY", 30).await.unwrap();
    assert_eq!(analysis.status, AnalysisStatus::InsufficientData);
    assert!(!analysis.suspicious_activity);
    assert!(analysis.min_price.is_none());
}

#[tokio::test]
async fn test_window_round_trip_preserves_order() {
    let (store, _analyzer) = setup();
    store.seed("B0ORDER", &[(96, 40), (72, 42), (48, 41), (24, 43), (1, 39)]);

    let since = chrono::Utc::now().naive_utc() - chrono::Duration::days(30);
    let window = store.window("B0ORDER", since).await.unwrap();

    assert_eq!(window.len(), 5);
    let prices: Vec<Decimal> = window.iter().map(|o| o.price).collect();
    let expected: Vec<Decimal> = [40, 42, 41, 43, 39].iter().map(|&p| Decimal::from(p)).collect();
    assert_eq!(prices, expected);
    assert!(window.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
}

#[tokio::test]
async fn test_new_product_passes_as_genuine() {
    let (_store, analyzer) = setup();

    let verdict = analyzer
        .is_genuine_discount("B0NEW", Decimal::from(30), Decimal::from(100))
        .await
        .unwrap();

    assert!(verdict.genuine);
    assert!(verdict.reason.contains("new product"));
}

#[tokio::test]
async fn test_small_discount_fails_regardless_of_history() {
    let (_store, analyzer) = setup();

    // 66.7% is under the 70% floor; no history query should matter
    let verdict = analyzer
        .is_genuine_discount("B0SMALL", Decimal::from(30), Decimal::from(90))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("66.7"));
}

#[tokio::test]
async fn test_list_not_above_current_fails() {
    let (_store, analyzer) = setup();

    let verdict = analyzer
        .is_genuine_discount("B0FLAT", Decimal::from(100), Decimal::from(90))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("not above current price"));
}

#[tokio::test]
async fn test_inflated_list_price_fails() {
    let (_store, analyzer) = setup();

    // 75.3% discount passes the floor, but 81 > 4 * 20
    let verdict = analyzer
        .is_genuine_discount("B0INFLATED", Decimal::from(20), Decimal::from(81))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("implausibly inflated"));
}

#[tokio::test]
async fn test_suspicious_history_fails() {
    let (store, analyzer) = setup();
    // 40% jump inside the last week
    store.seed("B0SPIKE", &[(30, 100), (20, 100), (10, 140)]);

    let verdict = analyzer
        .is_genuine_discount("B0SPIKE", Decimal::from(30), Decimal::from(100))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("suspicious"));
}

#[tokio::test]
async fn test_current_above_recent_minimum_fails() {
    let (store, analyzer) = setup();
    store.seed("B0MIN", &[(72, 20), (48, 20), (24, 20)]);

    // 30 is more than 20% above the recent minimum of 20
    let verdict = analyzer
        .is_genuine_discount("B0MIN", Decimal::from(30), Decimal::from(100))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("minimum"));
}

#[tokio::test]
async fn test_list_too_close_to_average_fails() {
    let (store, analyzer) = setup();
    store.seed("B0AVG", &[(72, 80), (48, 80), (24, 80)]);

    // List 100 is under 1.5x the historical average of 80
    let verdict = analyzer
        .is_genuine_discount("B0AVG", Decimal::from(30), Decimal::from(100))
        .await
        .unwrap();

    assert!(!verdict.genuine);
    assert!(verdict.reason.contains("average"));
}

#[tokio::test]
async fn test_clean_history_passes_as_genuine() {
    let (store, analyzer) = setup();
    store.seed("B0CLEAN", &[(72, 28), (48, 29), (24, 28)]);

    let verdict = analyzer
        .is_genuine_discount("B0CLEAN", Decimal::from(30), Decimal::from(100))
        .await
        .unwrap();

    assert!(verdict.genuine);
    assert!(verdict.reason.contains("70"));
}

#[tokio::test]
async fn test_fake_and_genuine_are_independent_rule_sets() {
    let (store, analyzer) = setup();
    // A 25% jump trips the bulk filter (> 1.2) but not the strict
    // spike rule (> 1.3, and it needs three observations)
    store.seed("B0SPLIT", &[(10, 20), (5, 25)]);

    let fake = analyzer
        .is_fake_discount(&product("B0SPLIT", 24, 96))
        .await
        .unwrap();
    assert!(fake);

    let verdict = analyzer
        .is_genuine_discount("B0SPLIT", Decimal::from(24), Decimal::from(96))
        .await
        .unwrap();
    assert!(verdict.genuine);
}

#[tokio::test]
async fn test_boundary_thresholds_differ() {
    let (store, analyzer) = setup();
    // Exactly a 30% jump: over the bulk filter's 1.2 bar, but the strict
    // rule is exclusive at 1.3
    store.seed("B0EDGE", &[(10, 100), (8, 100), (5, 130)]);

    let analysis = analyzer.analyze_asin("B0EDGE", 7).await.unwrap();
    assert!(!analysis.suspicious_activity);

    let fake = analyzer
        .is_fake_discount(&product("B0EDGE", 130, 150))
        .await
        .unwrap();
    assert!(fake);
}

#[tokio::test]
async fn test_fake_discount_needs_history() {
    let (_store, analyzer) = setup();

    // 96 > 3 * 24, but with no observations there is no evidence
    let fake = analyzer
        .is_fake_discount(&product("B0NOHIST", 24, 96))
        .await
        .unwrap();
    assert!(!fake);
}

#[tokio::test]
async fn test_fake_discount_list_price_rule() {
    let (store, analyzer) = setup();
    // Quiet history, but the stored list price is over 3x current
    store.seed("B0LIST", &[(10, 30), (5, 31)]);

    let fake = analyzer
        .is_fake_discount(&product("B0LIST", 30, 95))
        .await
        .unwrap();
    assert!(fake);

    let fake = analyzer
        .is_fake_discount(&product("B0LIST", 30, 89))
        .await
        .unwrap();
    assert!(!fake);
}

#[tokio::test]
async fn test_track_price_change_first_observation() {
    let (_store, analyzer) = setup();

    let report = analyzer
        .track_price_change("B0TRACK", Decimal::from(100))
        .await
        .unwrap();

    assert_eq!(report.previous_price, None);
    assert_eq!(report.current_price, Decimal::from(100));
    assert_eq!(report.price_change, Decimal::ZERO);
    assert_eq!(report.price_change_percent, Decimal::ZERO);
}

#[tokio::test]
async fn test_track_price_change_reports_drop() {
    let (_store, analyzer) = setup();

    analyzer
        .track_price_change("B0DROP", Decimal::from(100))
        .await
        .unwrap();
    let report = analyzer
        .track_price_change("B0DROP", Decimal::from(80))
        .await
        .unwrap();

    assert_eq!(report.previous_price, Some(Decimal::from(100)));
    assert_eq!(report.current_price, Decimal::from(80));
    assert_eq!(report.price_change, Decimal::from(-20));
    assert_eq!(report.price_change_percent, Decimal::from(-20));
}

#[tokio::test]
async fn test_track_price_change_unchanged_price() {
    let (_store, analyzer) = setup();

    analyzer
        .track_price_change("B0SAME", Decimal::from(50))
        .await
        .unwrap();
    let report = analyzer
        .track_price_change("B0SAME", Decimal::from(50))
        .await
        .unwrap();

    assert_eq!(report.previous_price, Some(Decimal::from(50)));
    assert_eq!(report.price_change, Decimal::ZERO);
    assert_eq!(report.price_change_percent, Decimal::ZERO);
}
