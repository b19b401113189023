//! Configuration for the store and service

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Back office configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Document store configuration
    pub store: StoreConfig,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Pricing defaults
    pub pricing: PricingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/backoffice"),
            service_name: "backoffice".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            store: StoreConfig::default(),
            rocksdb: RocksDBConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Expiry applied to every saved document (days, 0 = never)
    pub document_ttl_days: u64,

    /// Actor mailbox capacity
    pub mailbox_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            document_ttl_days: 180,
            mailbox_capacity: 1000,
        }
    }
}

impl StoreConfig {
    /// Expiry as a duration
    pub fn document_ttl(&self) -> Option<Duration> {
        match self.document_ttl_days {
            0 => None,
            days => Some(Duration::from_secs(days * 24 * 60 * 60)),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 16, // documents are few and small
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Pricing defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// RUB per CNY until a price list is saved
    pub default_currency_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_currency_rate: backoffice_core::PriceList::DEFAULT_CURRENCY_RATE,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("BACKOFFICE_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(days) = std::env::var("BACKOFFICE_DOCUMENT_TTL_DAYS") {
            config.store.document_ttl_days = days.parse().map_err(|_| {
                crate::Error::Config(format!("BACKOFFICE_DOCUMENT_TTL_DAYS invalid: {}", days))
            })?;
        }

        if let Ok(rate) = std::env::var("BACKOFFICE_CURRENCY_RATE") {
            let rate: Decimal = rate.parse().map_err(|_| {
                crate::Error::Config(format!("BACKOFFICE_CURRENCY_RATE invalid: {}", rate))
            })?;
            if rate <= Decimal::ZERO {
                return Err(crate::Error::Config(
                    "BACKOFFICE_CURRENCY_RATE must be > 0".to_string(),
                ));
            }
            config.pricing.default_currency_rate = rate;
        }

        Ok(config)
    }
}
