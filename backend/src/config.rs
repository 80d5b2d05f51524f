//! Configuration management for the Warehouse Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WMS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Replenishment engine tuning
    pub replenishment: ReplenishmentConfig,

    /// Bill text-extraction service configuration
    pub extraction: ExtractionConfig,

    /// External Purchasing system configuration
    pub purchasing: PurchasingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplenishmentConfig {
    /// Upper bound of the alerting range as a percentage of the threshold.
    /// 120 keeps a low-priority alert up to 1.2x the threshold.
    pub watch_band_percent: u32,

    /// Floor for computed order quantities
    pub minimum_order_size: i32,

    /// Lead time applied when a supplier has none configured
    pub default_lead_time_days: i64,

    /// Interval between full threshold sweeps, in seconds
    pub sweep_interval_secs: u64,

    /// Minimum name similarity accepted when auto-mapping bill lines
    pub name_match_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Bill text-extraction API endpoint
    pub api_endpoint: String,

    /// Bill text-extraction API key
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PurchasingConfig {
    /// Purchasing system API endpoint
    pub api_endpoint: String,

    /// Purchasing system API key
    pub api_key: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("replenishment.watch_band_percent", 120)?
            .set_default("replenishment.minimum_order_size", 1)?
            .set_default("replenishment.default_lead_time_days", 7)?
            .set_default("replenishment.sweep_interval_secs", 300)?
            .set_default("replenishment.name_match_threshold", 0.8)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WMS_ prefix)
            .add_source(
                Environment::with_prefix("WMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with. A misconfigured
    /// watch band or order floor is surfaced at startup, not defaulted.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.replenishment.watch_band_percent < 100 {
            return Err(ConfigError::Message(
                "replenishment.watch_band_percent must be at least 100".to_string(),
            ));
        }
        if self.replenishment.minimum_order_size < 1 {
            return Err(ConfigError::Message(
                "replenishment.minimum_order_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.replenishment.name_match_threshold) {
            return Err(ConfigError::Message(
                "replenishment.name_match_threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
