use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid analytics input: {0}")]
    InvalidInput(String),

    #[error("Calculation failed: {0}")]
    Calculation(String),
}
