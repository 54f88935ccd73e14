use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid strategy parameters: {0}")]
    InvalidParameters(String),

    #[error("Indicator error: {0}")]
    Indicator(String),
}
