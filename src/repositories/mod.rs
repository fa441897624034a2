pub mod preference_repository;
pub mod price_history_repository;
pub mod product_repository;

// Re-export all repositories for convenient access
pub use preference_repository::PreferenceRepository;
pub use price_history_repository::{PriceHistoryRepository, PriceHistoryStore};
pub use product_repository::ProductRepository;
