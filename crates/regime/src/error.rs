use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegimeError {
    #[error("Invalid regime parameters: {0}")]
    InvalidParameters(String),
}
