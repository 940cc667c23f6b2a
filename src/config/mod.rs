//! Configuration module for the HackMap store.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite file shared by every tab
    pub db_path: PathBuf,
    /// Path to the search index directory (in-memory index when unset)
    pub index_path: Option<PathBuf>,
    /// Overwrite every collection with seed data on startup
    pub force_reseed: bool,
    /// Artificial delay of the simulated email dispatcher
    pub email_delay: Duration,
    /// How often to poll the store revision for changes made by other processes
    pub watch_interval: Duration,
    /// Compare-and-swap attempts per mutator call before giving up
    pub max_write_retries: u32,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/hackmap.sqlite"),
            index_path: None,
            force_reseed: false,
            email_delay: Duration::from_millis(1000),
            watch_interval: Duration::from_millis(500),
            max_write_retries: 5,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let db_path = env::var("HACKMAP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let index_path = env::var("HACKMAP_INDEX_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let force_reseed = env::var("HACKMAP_FORCE_RESEED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let email_delay = Duration::from_millis(parse_or(
            "HACKMAP_EMAIL_DELAY_MS",
            defaults.email_delay.as_millis() as u64,
        ));

        let watch_interval = Duration::from_millis(parse_or(
            "HACKMAP_WATCH_INTERVAL_MS",
            defaults.watch_interval.as_millis() as u64,
        ));

        let max_write_retries = parse_or("HACKMAP_MAX_WRITE_RETRIES", defaults.max_write_retries);

        let log_level = env::var("HACKMAP_LOG_LEVEL").unwrap_or(defaults.log_level);

        Self {
            db_path,
            index_path,
            force_reseed,
            email_delay,
            watch_interval,
            max_write_retries,
            log_level,
        }
    }
}

/// Parse a numeric variable, keeping the default when it is missing or malformed.
fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
