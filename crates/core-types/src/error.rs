use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid value for field {field}: {message}")]
    InvalidValue { field: String, message: String },
}
