//! Configuration loading and typed config for the economy service.
//!
//! The canonical configuration lives in `tradepost-config.yaml`. Every field
//! has a default, so an empty document (or no file at all) yields a working
//! service. Values are validated after loading.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tradepost_types::WeeklySale;

/// Environment variable that overrides [`EconomyConfig::shutdown_timeout_ms`].
pub const SHUTDOWN_TIMEOUT_ENV: &str = "TRADEPOST_SHUTDOWN_TIMEOUT_MS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Economy tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Fraction of an item's base value paid out when it is sold.
    #[serde(default = "default_sell_price_ratio")]
    pub sell_price_ratio: Decimal,

    /// Transaction value per point of merchant experience.
    #[serde(default = "default_merchant_xp_divisor")]
    pub merchant_xp_divisor: u64,

    /// Largest quantity a single buy or sell may request.
    #[serde(default = "default_max_transaction_quantity")]
    pub max_transaction_quantity: u64,

    /// Length of the weekly sale rotation, in weeks.
    #[serde(default = "default_sale_rotation_weeks")]
    pub sale_rotation_weeks: u32,

    /// How long shutdown waits for background tasks.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Job that receives experience for trades.
    #[serde(default = "default_merchant_job_key")]
    pub merchant_job_key: String,

    /// Modifier key applied to sell prices.
    #[serde(default = "default_economy_bonus_feature")]
    pub economy_bonus_feature: String,

    /// Feature that must be unlocked for weekly sales to apply.
    #[serde(default = "default_weekly_discount_feature")]
    pub weekly_discount_feature: String,

    /// Weekly sale rotation handed to the service at startup.
    #[serde(default)]
    pub weekly_sales: Vec<WeeklySale>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            sell_price_ratio: default_sell_price_ratio(),
            merchant_xp_divisor: default_merchant_xp_divisor(),
            max_transaction_quantity: default_max_transaction_quantity(),
            sale_rotation_weeks: default_sale_rotation_weeks(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            merchant_job_key: default_merchant_job_key(),
            economy_bonus_feature: default_economy_bonus_feature(),
            weekly_discount_feature: default_weekly_discount_feature(),
            weekly_sales: Vec::new(),
        }
    }
}

impl EconomyConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override values from environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(SHUTDOWN_TIMEOUT_ENV) {
            match val.parse() {
                Ok(ms) => self.shutdown_timeout_ms = ms,
                Err(e) => tracing::warn!(
                    var = SHUTDOWN_TIMEOUT_ENV,
                    value = %val,
                    error = %e,
                    "Ignoring unparseable environment override"
                ),
            }
        }
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sell_price_ratio.is_sign_negative() || self.sell_price_ratio > Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "sell_price_ratio",
                reason: format!("{} is outside 0..=1", self.sell_price_ratio),
            });
        }
        if self.max_transaction_quantity == 0 {
            return Err(ConfigError::Invalid {
                field: "max_transaction_quantity",
                reason: String::from("must be at least 1"),
            });
        }
        if i64::try_from(self.max_transaction_quantity).is_err() {
            return Err(ConfigError::Invalid {
                field: "max_transaction_quantity",
                reason: String::from("must fit in a signed 64-bit quantity"),
            });
        }
        if self.sale_rotation_weeks == 0 {
            return Err(ConfigError::Invalid {
                field: "sale_rotation_weeks",
                reason: String::from("must be at least 1"),
            });
        }
        if let Some(sale) = self
            .weekly_sales
            .iter()
            .find(|sale| sale.week_offset >= self.sale_rotation_weeks)
        {
            return Err(ConfigError::Invalid {
                field: "weekly_sales",
                reason: format!(
                    "week_offset {} is outside a {}-week rotation",
                    sale.week_offset, self.sale_rotation_weeks
                ),
            });
        }
        Ok(())
    }

    /// Shutdown deadline as a [`Duration`].
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_sell_price_ratio() -> Decimal {
    Decimal::new(40, 2)
}

const fn default_merchant_xp_divisor() -> u64 {
    10
}

const fn default_max_transaction_quantity() -> u64 {
    10_000
}

const fn default_sale_rotation_weeks() -> u32 {
    4
}

const fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

fn default_merchant_job_key() -> String {
    "merchant".to_owned()
}

fn default_economy_bonus_feature() -> String {
    "economy_bonus".to_owned()
}

fn default_weekly_discount_feature() -> String {
    "feature_weekly_discount".to_owned()
}
