use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// A single product feed endpoint (one per scraped site)
#[derive(Debug, Clone)]
pub struct FeedEndpoint {
    pub source: String,
    pub url: String,
}

/// Product feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub endpoints: Vec<FeedEndpoint>,
    pub request_timeout_secs: u64,
}

/// Push gateway configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub gateway_url: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

/// Scheduled job intervals and retention windows
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub ingest_interval_mins: u64,
    pub price_track_interval_mins: u64,
    pub alert_digest_interval_hours: u64,
    pub cleanup_interval_hours: u64,
    pub health_check_interval_mins: u64,
    pub new_deal_window_hours: i64,
    pub price_history_retention_days: i64,
    pub stale_product_days: i64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub push: PushConfig,
    pub jobs: JobsConfig,
    pub log_level: String,
    pub environment: String,
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let acquire_timeout_secs = env_u64("DATABASE_ACQUIRE_TIMEOUT_SECS", 30);
        let idle_timeout_secs = env_u64("DATABASE_IDLE_TIMEOUT_SECS", 600); // 10 minutes
        let max_lifetime_secs = env_u64("DATABASE_MAX_LIFETIME_SECS", 1800); // 30 minutes

        let test_before_acquire = env::var("DATABASE_TEST_BEFORE_ACQUIRE")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/dealradar".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl FeedConfig {
    /// Create feed config from environment variables
    ///
    /// `FEED_ENDPOINTS` holds comma-separated `source=url` pairs, e.g.
    /// `amazon=http://scraper:9000/deals,trendmall=http://scraper:9001/deals`.
    pub fn from_env() -> Result<Self, String> {
        let raw = env::var("FEED_ENDPOINTS").unwrap_or_default();

        let mut endpoints = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (source, url) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid FEED_ENDPOINTS entry: {}", entry))?;

            if source.is_empty() || url.is_empty() {
                return Err(format!("Invalid FEED_ENDPOINTS entry: {}", entry));
            }

            endpoints.push(FeedEndpoint {
                source: source.to_string(),
                url: url.to_string(),
            });
        }

        Ok(Self {
            endpoints,
            request_timeout_secs: env_u64("FEED_REQUEST_TIMEOUT_SECS", 30),
        })
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

impl PushConfig {
    /// Create push config from environment variables
    pub fn from_env() -> Self {
        Self {
            gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
            auth_token: env::var("PUSH_AUTH_TOKEN").ok(),
            request_timeout_secs: env_u64("PUSH_REQUEST_TIMEOUT_SECS", 10),
        }
    }

    /// Whether a push gateway has been configured
    pub fn is_configured(&self) -> bool {
        self.gateway_url.is_some()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            auth_token: None,
            request_timeout_secs: 10,
        }
    }
}

impl JobsConfig {
    /// Create jobs config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let config = Self {
            ingest_interval_mins: env_u64("INGEST_INTERVAL_MINS", 60),
            price_track_interval_mins: env_u64("PRICE_TRACK_INTERVAL_MINS", 30),
            alert_digest_interval_hours: env_u64("ALERT_DIGEST_INTERVAL_HOURS", 6),
            cleanup_interval_hours: env_u64("CLEANUP_INTERVAL_HOURS", 24),
            health_check_interval_mins: env_u64("HEALTH_CHECK_INTERVAL_MINS", 15),
            new_deal_window_hours: env_i64("NEW_DEAL_WINDOW_HOURS", 2),
            price_history_retention_days: env_i64("PRICE_HISTORY_RETENTION_DAYS", 90),
            stale_product_days: env_i64("STALE_PRODUCT_DAYS", 30),
        };

        if config.ingest_interval_mins == 0 {
            return Err("INGEST_INTERVAL_MINS must be greater than 0".to_string());
        }

        if config.price_history_retention_days <= 0 {
            return Err("PRICE_HISTORY_RETENTION_DAYS must be greater than 0".to_string());
        }

        Ok(config)
    }

    pub fn ingest_interval(&self) -> Duration {
        Duration::from_secs(self.ingest_interval_mins * 60)
    }

    pub fn price_track_interval(&self) -> Duration {
        Duration::from_secs(self.price_track_interval_mins * 60)
    }

    pub fn alert_digest_interval(&self) -> Duration {
        Duration::from_secs(self.alert_digest_interval_hours * 3600)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours * 3600)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_mins * 60)
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ingest_interval_mins: 60,
            price_track_interval_mins: 30,
            alert_digest_interval_hours: 6,
            cleanup_interval_hours: 24,
            health_check_interval_mins: 15,
            new_deal_window_hours: 2,
            price_history_retention_days: 90,
            stale_product_days: 30,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let feed = FeedConfig::from_env()?;
        let push = PushConfig::from_env();
        let jobs = JobsConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            feed,
            push,
            jobs,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            feed: FeedConfig::default(),
            push: PushConfig::default(),
            jobs: JobsConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.jobs.ingest_interval_mins, 60);
        assert!(!config.push.is_configured());
    }

    #[test]
    fn test_jobs_config_intervals() {
        let jobs = JobsConfig::default();
        assert_eq!(jobs.price_track_interval(), Duration::from_secs(30 * 60));
        assert_eq!(jobs.cleanup_interval(), Duration::from_secs(24 * 3600));
    }
}
