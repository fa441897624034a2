//! DealRadar Backend Service
//!
//! Main entry point for the DealRadar discount tracking backend.
//! This service provides:
//! - Scheduled ingestion of scraped product feeds
//! - Price history tracking and fake-discount analysis
//! - Push alerts for verified deals and price drops

use dealradar_backend::config::AppConfig;
use dealradar_backend::database::{create_pool, run_migrations};
use dealradar_backend::error::{AppError, AppResult};
use dealradar_backend::feed::{HttpFeed, ProductFeed};
use dealradar_backend::notifier::PushNotifier;
use dealradar_backend::repositories::PriceHistoryStore;
use dealradar_backend::scheduler::{Job, Scheduler};
use dealradar_backend::services::{
    AlertService, DealService, DiscountAnalyzer, IngestRun, IngestService,
};
use dealradar_backend::AppState;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dealradar_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║          DealRadar Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Feed endpoints: {}", config.feed.endpoints.len());

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let state = Arc::new(AppState::new(pool.clone()));
    info!("✓ Application state initialized with repositories");

    let history: Arc<dyn PriceHistoryStore> = state.price_history_repo.clone();

    let analyzer = Arc::new(DiscountAnalyzer::new(history.clone()));
    info!("✓ Discount analyzer initialized");

    let deal_service = Arc::new(DealService::new(
        state.product_repo.clone(),
        state.price_history_repo.clone(),
        analyzer.clone(),
    ));

    let notifier = Arc::new(PushNotifier::new(config.push.clone())?);
    if notifier.is_configured() {
        info!("✓ Push notifier initialized");
    } else {
        warn!("PUSH_GATEWAY_URL not configured - notifications will be dropped");
    }

    let alert_service = Arc::new(AlertService::new(
        state.product_repo.clone(),
        state.preference_repo.clone(),
        history.clone(),
        analyzer.clone(),
        deal_service.clone(),
        notifier.clone(),
    ));
    info!("✓ Alert service initialized");

    let ingest_service = Arc::new(IngestService::new(
        state.product_repo.clone(),
        analyzer.clone(),
    ));

    let feeds: Arc<Vec<HttpFeed>> = Arc::new(HttpFeed::from_config(&config.feed)?);
    if feeds.is_empty() {
        warn!("No feed endpoints configured - ingestion job will be idle");
    }

    // =========================================================================
    // SCHEDULED JOBS
    // =========================================================================
    info!("Registering scheduled jobs...");

    let mut scheduler = Scheduler::new();
    let scheduler_status = scheduler.status_handle();

    // Feed ingestion + new-deal broadcast
    {
        let feeds = feeds.clone();
        let ingest = ingest_service.clone();
        let alerts = alert_service.clone();
        let new_deal_window = config.jobs.new_deal_window_hours;

        scheduler.register(Job::new(
            "deal-ingest",
            config.jobs.ingest_interval(),
            move || {
                let feeds = feeds.clone();
                let ingest = ingest.clone();
                let alerts = alerts.clone();

                async move {
                    for feed in feeds.iter() {
                        let run = IngestRun::new(feed.source());
                        match feed.fetch().await {
                            Ok(items) => {
                                info!(
                                    "[{}] Fetched {} records from '{}'",
                                    run.id,
                                    items.len(),
                                    run.source
                                );
                                ingest.ingest_batch(&run, items).await;
                            }
                            Err(e) => {
                                warn!("[{}] Feed '{}' failed: {:#}", run.id, run.source, e);
                            }
                        }
                    }

                    alerts.notify_new_deals(new_deal_window).await
                }
            },
        ));
    }

    // Price-drop tracking
    {
        let alerts = alert_service.clone();

        scheduler.register(Job::new(
            "price-tracking",
            config.jobs.price_track_interval(),
            move || {
                let alerts = alerts.clone();
                async move { alerts.notify_price_drops(24).await }
            },
        ));
    }

    // Per-device genuine-deal digests
    {
        let alerts = alert_service.clone();

        scheduler.register(Job::new(
            "alert-digest",
            config.jobs.alert_digest_interval(),
            move || {
                let alerts = alerts.clone();
                async move { alerts.send_preference_digests().await }
            },
        ));
    }

    // Data cleanup
    {
        let products = state.product_repo.clone();
        let history_repo = state.price_history_repo.clone();
        let retention_days = config.jobs.price_history_retention_days;
        let stale_days = config.jobs.stale_product_days;

        scheduler.register(Job::new(
            "data-cleanup",
            config.jobs.cleanup_interval(),
            move || {
                let products = products.clone();
                let history_repo = history_repo.clone();

                async move {
                    let now = Utc::now().naive_utc();

                    let removed_records = history_repo
                        .delete_older_than(now - Duration::days(retention_days))
                        .await?;
                    let removed_products = products
                        .delete_stale(now - Duration::days(stale_days))
                        .await?;

                    info!(
                        "Cleanup removed {} price records and {} stale products",
                        removed_records, removed_products
                    );
                    Ok(())
                }
            },
        ));
    }

    // Health check
    {
        let deals = deal_service.clone();
        let notifier = notifier.clone();
        let status = scheduler_status.clone();

        scheduler.register(Job::new(
            "health-check",
            config.jobs.health_check_interval(),
            move || {
                let deals = deals.clone();
                let notifier = notifier.clone();
                let status = status.clone();

                async move {
                    let stats = deals.price_statistics().await?;
                    info!(
                        "Health: {} products, {} price records ({} in 24h), avg discount {}%, push configured: {}",
                        stats.active_products,
                        stats.total_price_records,
                        stats.recent_price_records,
                        stats.average_discount,
                        notifier.is_configured()
                    );

                    let map = status.read().await;
                    for (name, job_status) in map.iter() {
                        if let Some(err) = &job_status.last_error {
                            warn!("Job '{}' last run failed: {}", name, err);
                        }
                    }
                    Ok(())
                }
            },
        ));
    }

    // =========================================================================
    // READY
    // =========================================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = scheduler.spawn_all(shutdown_rx);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║          DealRadar Backend Service Ready!                 ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::signal::ctrl_c().await.map_err(|e| {
        AppError::Message(format!("Failed to listen for shutdown signal: {}", e))
    })?;

    info!("Shutdown signal received, stopping jobs...");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        let _ = handle.await;
    }

    info!("Shutdown complete");
    Ok(())
}
