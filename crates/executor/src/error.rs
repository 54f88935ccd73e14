use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the exchange gateway.
///
/// `Connectivity` is kept distinct from venue-side rejections because the
/// circuit breaker treats a dead link and a rejected order the same way, but
/// operators do not.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway connectivity failure: {0}")]
    Connectivity(String),

    #[error("Order rejected by venue: {0}")]
    Rejected(String),

    #[error("Venue does not know order {0}")]
    UnknownOrder(Uuid),
}

impl GatewayError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Connectivity(_))
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Fill references unknown client order id {0}")]
    UnknownFill(Uuid),

    #[error("Not enough cash to settle fill. Required: {required}, Available: {available}")]
    InsufficientCash { required: String, available: String },

    #[error("An unexpected ledger state was encountered: {0}")]
    Ledger(String),
}
