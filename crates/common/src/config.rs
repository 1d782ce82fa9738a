//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Connection pool sizing
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// Runtime configuration
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: parse_or("DB_MIN_CONNECTIONS", 1)?,
            db_acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "volha=debug".to_string()),
        };

        if config.db_min_connections > config.db_max_connections {
            anyhow::bail!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                config.db_min_connections,
                config.db_max_connections
            );
        }

        Ok(config)
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} is not a valid number: {e}")),
        Err(_) => Ok(default),
    }
}
