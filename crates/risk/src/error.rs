use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid risk parameters: {0}")]
    InvalidParameters(String),
}
