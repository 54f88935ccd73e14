use chrono::{DateTime, Utc};
use core_types::{Fill, LegStatus, Position, Regime, RejectReason, StrategyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A risk control acted on a trade: a rejection, a halt, or a recovery
/// performed by the execution manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Stable machine-readable code, e.g. "circuit_open" or "leg_failure".
    pub reason: RejectReason,
    pub detail: String,
}

/// The selector swapped the active strategy after a stable regime change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeChange {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub from: Regime,
    pub to: Regime,
    pub confidence: Decimal,
    pub strategy: StrategyId,
}

/// An order leg reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub timestamp: DateTime<Utc>,
    pub client_order_id: Uuid,
    pub symbol: String,
    pub status: LegStatus,
}

/// A complete snapshot of the account's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub timestamp: DateTime<Utc>,
    pub cash: Decimal,
    pub total_value: Decimal,
    pub positions: Vec<Position>,
}

impl PortfolioState {
    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn position_for(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

/// The top-level event enum broadcast by the engine.
///
/// The `#[serde(tag = "type", content = "payload")]` attribute serializes each
/// variant into a tagged JSON object, which keeps downstream recorders free of
/// positional decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    Risk(RiskEvent),
    RegimeChange(RegimeChange),
    OrderOutcome(OrderOutcome),
    FillApplied(Fill),
    PortfolioState(PortfolioState),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = EngineEvent::Risk(RiskEvent {
            timestamp: Utc::now(),
            symbol: "BTCUSDT".to_string(),
            reason: RejectReason::CircuitOpen,
            detail: "breaker tripped after 5 consecutive failures".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Risk");
        assert_eq!(json["payload"]["reason"], "CircuitOpen");
    }

    #[test]
    fn portfolio_state_lookups() {
        let state = PortfolioState {
            timestamp: Utc::now(),
            cash: dec!(1000),
            total_value: dec!(1000),
            positions: vec![],
        };
        assert_eq!(state.open_positions(), 0);
        assert!(state.position_for("BTCUSDT").is_none());
    }
}
