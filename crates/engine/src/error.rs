use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("Regime error: {0}")]
    Regime(#[from] regime::RegimeError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Risk error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Executor error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("No trading loop configured for symbol: {0}")]
    UnknownSymbol(String),
}
