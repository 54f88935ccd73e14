//! # Meridian Configuration
//!
//! Loads and validates the strongly-typed application settings from a TOML
//! file. The rest of the system never touches the `config` crate directly;
//! components are *given* their parameter structs (dependency injection), they
//! do not load configuration themselves.

use crate::error::ConfigError;
use rust_decimal::Decimal;

pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalyticsSettings, CircuitBreakerSettings, Config, ExchangeSettings, MeanReversionParams,
    MomentumParams, RegimeSettings, RiskSettings, ScalpingParams, Strategies, TradingSettings,
};

/// Loads the application configuration from the `config.toml` file in the
/// working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads the application configuration from an explicit path.
pub fn load_config_from(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Rejects configurations that are syntactically valid but logically broken.
fn validate(config: &Config) -> Result<(), ConfigError> {
    fn fraction(name: &str, value: Decimal) -> Result<(), ConfigError> {
        if value <= Decimal::ZERO || value >= Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be strictly between 0 and 1, got {value}"
            )));
        }
        Ok(())
    }

    if config.trading.symbols.is_empty() {
        return Err(ConfigError::ValidationError(
            "trading.symbols must not be empty".to_string(),
        ));
    }
    if config.trading.initial_capital <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "trading.initial_capital must be positive".to_string(),
        ));
    }
    fraction("risk.max_drawdown_pct", config.risk.max_drawdown_pct)?;
    fraction("risk.max_risk_per_trade_pct", config.risk.max_risk_per_trade_pct)?;
    fraction("risk.stop_loss_pct", config.risk.stop_loss_pct)?;
    fraction("risk.daily_loss_limit_pct", config.risk.daily_loss_limit_pct)?;

    if config.risk.max_open_positions == 0 {
        return Err(ConfigError::ValidationError(
            "risk.max_open_positions must be at least 1".to_string(),
        ));
    }
    if config.circuit_breaker.error_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "circuit_breaker.error_threshold must be at least 1".to_string(),
        ));
    }
    if config.regime.short_ma_period >= config.regime.long_ma_period {
        return Err(ConfigError::ValidationError(
            "regime.short_ma_period must be less than regime.long_ma_period".to_string(),
        ));
    }
    if config.regime.regime_stability_window == 0 {
        return Err(ConfigError::ValidationError(
            "regime.regime_stability_window must be at least 1".to_string(),
        ));
    }
    if config.strategies.momentum.short_window >= config.strategies.momentum.long_window {
        return Err(ConfigError::ValidationError(
            "strategies.momentum.short_window must be less than long_window".to_string(),
        ));
    }

    Ok(())
}
