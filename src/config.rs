use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Tunables for the booking service. Defaults mirror the behavior of the
/// original admin application: a five-day slot-search horizon, business hours
/// not enforced on the booking path, three fetch retries.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    pub search_horizon_days: u32,
    pub enforce_business_hours: bool,
    pub max_fetch_retries: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            search_horizon_days: 5,
            enforce_business_hours: false,
            max_fetch_retries: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10), // Default value
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1), // Default value
        };

        let defaults = SchedulingConfig::default();
        let search_horizon_days = match env::var("SCHEDULING_SEARCH_HORIZON_DAYS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse SCHEDULING_SEARCH_HORIZON_DAYS")?,
            Err(_) => defaults.search_horizon_days,
        };
        let enforce_business_hours = match env::var("SCHEDULING_ENFORCE_BUSINESS_HOURS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse SCHEDULING_ENFORCE_BUSINESS_HOURS")?,
            Err(_) => defaults.enforce_business_hours,
        };
        let max_fetch_retries = match env::var("SCHEDULING_MAX_FETCH_RETRIES") {
            Ok(val) => val
                .parse()
                .context("Failed to parse SCHEDULING_MAX_FETCH_RETRIES")?,
            Err(_) => defaults.max_fetch_retries,
        };

        Ok(Config {
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            scheduling: SchedulingConfig {
                search_horizon_days,
                enforce_business_hours,
                max_fetch_retries,
            },
        })
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config is not initialized")
}
