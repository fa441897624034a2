//! DealRadar Backend Library
//!
//! This module exposes the backend components for use by tests and other
//! consumers.

pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod models;
pub mod notifier;
pub mod repositories;
pub mod scheduler;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use repositories::*;
use std::sync::Arc;

/// Application state containing all repositories
pub struct AppState {
    pub database: Database,
    pub product_repo: Arc<ProductRepository>,
    pub price_history_repo: Arc<PriceHistoryRepository>,
    pub preference_repo: Arc<PreferenceRepository>,
}

impl AppState {
    /// Create a new AppState with initialized repositories
    pub fn new(pool: sqlx::PgPool) -> Self {
        let database = Database::new(pool.clone());

        Self {
            database: database.clone(),
            product_repo: Arc::new(ProductRepository::new(pool.clone())),
            price_history_repo: Arc::new(PriceHistoryRepository::new(pool.clone())),
            preference_repo: Arc::new(PreferenceRepository::new(pool)),
        }
    }
}
