use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Fill, LegStatus, OrderLeg};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The terminal outcome of a submitted order leg.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub client_order_id: Uuid,
    pub status: LegStatus,
    /// Whatever executed before the leg reached its terminal state: the full
    /// quantity on `Filled`, a partial quantity when the leg failed after
    /// executing some of it, `None` when nothing traded.
    pub fill: Option<Fill>,
}

/// A generic interface to an exchange venue.
///
/// `submit_order` drives the leg to a terminal state and resolves with the
/// outcome; the execution manager bounds that wait with its own timeout and
/// falls back to `cancel_order` when the deadline passes. Implementations must
/// surface link problems as `GatewayError::Connectivity` so the circuit
/// breaker can distinguish a dead venue from a rejected order.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn submit_order(&self, leg: &OrderLeg) -> Result<OrderResult, GatewayError>;

    /// Best-effort cancellation of a still-pending leg.
    async fn cancel_order(&self, symbol: &str, client_order_id: Uuid) -> Result<(), GatewayError>;
}

/// The dry-run venue: fills every leg immediately at its requested price and
/// charges the configured taker fee. Used by tests and `--dry-run` mode.
pub struct SimulatedGateway {
    taker_fee_pct: Decimal,
}

impl SimulatedGateway {
    pub fn new(taker_fee_pct: Decimal) -> Self {
        Self { taker_fee_pct }
    }
}

#[async_trait]
impl ExchangeGateway for SimulatedGateway {
    async fn submit_order(&self, leg: &OrderLeg) -> Result<OrderResult, GatewayError> {
        let fee = leg.price * leg.quantity * self.taker_fee_pct;
        let fill = Fill {
            client_order_id: leg.client_order_id,
            symbol: leg.symbol.clone(),
            side: leg.side,
            price: leg.price,
            quantity: leg.quantity,
            fee,
            timestamp: Utc::now(),
        };
        tracing::debug!(
            symbol = %leg.symbol,
            side = ?leg.side,
            price = %leg.price,
            quantity = %leg.quantity,
            "simulated fill"
        );
        Ok(OrderResult {
            client_order_id: leg.client_order_id,
            status: LegStatus::Filled,
            fill: Some(fill),
        })
    }

    async fn cancel_order(&self, _symbol: &str, _client_order_id: Uuid) -> Result<(), GatewayError> {
        // Simulated fills are instantaneous, so there is never anything
        // pending to cancel.
        Ok(())
    }
}
