use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to serialize event: {0}")]
    Serialization(String),
}
