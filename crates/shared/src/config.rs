//! Application configuration management.

use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Company configuration chosen at sign-up.
    pub company: CompanyConfig,
    /// Approval engine defaults.
    pub approval: ApprovalConfig,
    /// Exchange-rate cache configuration.
    pub rates: RatesConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Company configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    /// Company display name.
    pub name: String,
    /// Currency every approved expense is converted into.
    pub base_currency: Currency,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: "Acme Corporation".to_string(),
            base_currency: Currency::Usd,
        }
    }
}

/// Approval engine defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Threshold applied to rules saved without a minimum approval percentage.
    pub default_min_percentage: u8,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_min_percentage: 100,
        }
    }
}

/// Exchange-rate cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Maximum number of cached currency pairs.
    pub cache_capacity: u64,
    /// Time-to-live for cached rates in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            cache_ttl_secs: 3600, // 1 hour
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "approvalflow=debug,info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, `APPROVALFLOW__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is out of range.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPROVALFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first invalid value.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.approval.default_min_percentage > 100 {
            return Err(config::ConfigError::Message(format!(
                "approval.default_min_percentage must be within 0..=100, got {}",
                self.approval.default_min_percentage
            )));
        }
        if self.rates.cache_ttl_secs == 0 {
            return Err(config::ConfigError::Message(
                "rates.cache_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
