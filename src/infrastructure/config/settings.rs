//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section is optional; an empty file yields the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use diboas_core::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assets::{asset_catalog, validate_assets, AssetConfig};
use super::fees::{fee_schedule, validate_tables, KindFeeConfig, NetworkConfig, RoutingConfig};
use super::gateway::GatewayConfig;
use super::ledger::LedgerConfig;
use super::logging::LoggingConfig;
use crate::application::ServiceSettings;
use crate::domain::{AssetCatalog, Chain, FeeSchedule, TransactionKind};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// History size and logical lock timing.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Confirmation polling, retention and chain retries.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Default chain and bridge cost parameters.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-type fee overrides, keyed by transaction type.
    #[serde(default)]
    pub fees: BTreeMap<TransactionKind, KindFeeConfig>,

    /// Per-chain network fee overrides.
    #[serde(default)]
    pub networks: BTreeMap<Chain, NetworkConfig>,

    /// Asset catalog overrides, keyed by symbol.
    #[serde(default)]
    pub assets: BTreeMap<String, AssetConfig>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed
    /// or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Check that values are within acceptable ranges.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;

        if self.ledger.history_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.history_cap",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.ledger.lock_stale_after_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.lock_stale_after_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.ledger.lock_wait_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.lock_wait_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.ledger.settled_cap < self.ledger.history_cap {
            return Err(ConfigError::InvalidValue {
                field: "ledger.settled_cap",
                reason: "must be at least ledger.history_cap".to_string(),
            }
            .into());
        }
        if self.ledger.max_amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "ledger.max_amount",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let gateway = &self.gateway;
        if gateway.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if gateway.max_poll_interval_ms < gateway.poll_interval_ms {
            return Err(ConfigError::InvalidValue {
                field: "gateway.max_poll_interval_ms",
                reason: "must be >= poll_interval_ms".to_string(),
            }
            .into());
        }
        if !gateway.backoff_multiplier.is_finite() || gateway.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }
        if gateway.max_poll_attempts == 0 || gateway.max_poll_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.max_poll_attempts",
                reason: "polling bounds must be greater than 0".to_string(),
            }
            .into());
        }
        if gateway.confirmation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.confirmation_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let retry = &gateway.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.retry.max_attempts",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if retry.max_delay_ms < retry.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "gateway.retry.max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.retry.backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }

        self.routing.validate()?;
        validate_tables(&self.fees, &self.networks)?;
        validate_assets(&self.assets)?;
        Ok(())
    }

    /// Initialize the tracing subscriber from `[logging]`.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Effective fee schedule: built-in table with file overrides applied.
    #[must_use]
    pub fn fee_schedule(&self) -> FeeSchedule {
        fee_schedule(&self.fees, &self.networks, &self.routing)
            .with_max_amount(self.ledger.max_amount)
    }

    /// Effective asset catalog.
    #[must_use]
    pub fn asset_catalog(&self) -> AssetCatalog {
        asset_catalog(&self.assets)
    }

    /// Everything the transaction service is built from.
    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            ledger: self.ledger.settings(self.gateway.settings().retention),
            gateway: self.gateway.settings(),
            routing: self.routing.settings(),
            fees: self.fee_schedule(),
            assets: self.asset_catalog(),
            confirmation_timeout: self.gateway.confirmation_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        let settings = config.service_settings();

        assert_eq!(settings.ledger.history_cap, 100);
        assert_eq!(settings.gateway.poll.interval, Duration::from_millis(2000));
        assert_eq!(settings.gateway.retention, Duration::from_millis(60_000));
        assert_eq!(settings.routing.default_chain, Chain::Solana);
        assert!(settings.assets.get(&"BTC".into()).is_some());
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
[ledger]
history_cap = 10

[routing]
default_chain = "ethereum"

[fees.add]
diboas_rate = "0.01"
min_amount = "1"

[networks.solana]
fee = "0"

[assets.doge]
chain = "bitcoin"
reference_price = "0.1"
"#,
        )
        .unwrap();

        assert_eq!(config.ledger.history_cap, 10);
        assert_eq!(config.routing.default_chain, Chain::Ethereum);
        let fees = config.fee_schedule();
        assert_eq!(fees.min_amount(TransactionKind::Add), dec!(1));
        assert_eq!(fees.diboas_fee(TransactionKind::Add, dec!(100)), dec!(1));
        assert_eq!(fees.network_fee(Chain::Solana), dec!(0));
        assert!(config.asset_catalog().is_allowed(&"DOGE".into()));
    }

    #[test]
    fn rejects_backoff_below_one() {
        let err = Config::parse_toml("[gateway]\nbackoff_multiplier = 0.5\n").unwrap_err();
        assert!(err.to_string().contains("gateway.backoff_multiplier"));
    }

    #[test]
    fn rejects_stablecoin_asset() {
        let err = Config::parse_toml(
            "[assets.usdc]\nchain = \"solana\"\nreference_price = \"1\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("stablecoin"));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Config::parse_toml("[logging]\nformat = \"xml\"\n").is_err());
    }
}
