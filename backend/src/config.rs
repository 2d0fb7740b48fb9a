//! Configuration management for the clinic operations backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CLINIC_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{LedgerPolicy, NegativeStockPolicy};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Stock ledger and report settings
    pub inventory: InventoryConfig,

    /// Admin notification settings
    pub notifications: NotificationConfig,
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
    /// Secret the staff portal signs access tokens with
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Lots expiring within this many days are flagged near expiry
    pub near_expiry_days: i64,

    /// Default look-ahead window of the expiring-soon report
    pub expiring_window_days: i64,

    /// Whether outgoing movements may drive stock below zero
    pub negative_stock: NegativeStockPolicy,
}

impl InventoryConfig {
    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            negative_stock: self.negative_stock,
            near_expiry_days: self.near_expiry_days,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Optional endpoint that receives admin events as JSON
    pub webhook_url: Option<String>,

    /// Key for the X-Clinic-Signature header on webhook deliveries
    pub webhook_secret: Option<String>,

    /// Webhook request timeout in seconds
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CLINIC_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.near_expiry_days", shared::NEAR_EXPIRY_DAYS)?
            .set_default("inventory.expiring_window_days", 30)?
            .set_default("inventory.negative_stock", "allow")?
            .set_default("notifications.timeout_secs", 5)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CLINIC_ prefix)
            .add_source(
                Environment::with_prefix("CLINIC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.inventory.validate_windows()?;
        Ok(config)
    }
}

impl InventoryConfig {
    /// Reject expiry windows the ledger cannot work with
    fn validate_windows(&self) -> Result<(), ConfigError> {
        shared::validate_expiry_window(self.near_expiry_days).map_err(|m| {
            ConfigError::Message(format!("inventory.near_expiry_days: {}", m))
        })?;
        shared::validate_expiry_window(self.expiring_window_days).map_err(|m| {
            ConfigError::Message(format!("inventory.expiring_window_days: {}", m))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(near_expiry_days: i64, expiring_window_days: i64) -> InventoryConfig {
        InventoryConfig {
            near_expiry_days,
            expiring_window_days,
            negative_stock: NegativeStockPolicy::Allow,
        }
    }

    #[test]
    fn accepts_default_windows() {
        assert!(inventory(shared::NEAR_EXPIRY_DAYS, 30).validate_windows().is_ok());
    }

    #[test]
    fn rejects_out_of_range_windows() {
        assert!(inventory(0, 30).validate_windows().is_err());
        assert!(inventory(-7, 30).validate_windows().is_err());
        assert!(inventory(10_000_000_000_000, 30).validate_windows().is_err());
        assert!(inventory(30, 366).validate_windows().is_err());
    }
}
