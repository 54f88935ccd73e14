use crate::enums::{LegStatus, OrderKind, OrderSide, Regime, RejectReason, StrategyId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single price level of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// A point-in-time view of one symbol's market.
///
/// Snapshots are immutable once constructed. The market cache replaces the
/// whole `Arc<MarketSnapshot>` on every update, so a reader either sees the
/// previous snapshot or the new one, never a half-written mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// Bids sorted best (highest) first.
    pub bids: Vec<BookLevel>,
    /// Asks sorted best (lowest) first.
    pub asks: Vec<BookLevel>,
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Midpoint of the best bid and ask, if both sides are present.
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some((bid + ask) / Decimal::TWO)
    }

    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some(ask - bid)
    }

    /// Spread as a fraction of the mid price.
    pub fn spread_pct(&self) -> Option<Decimal> {
        let spread = self.spread()?;
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        Some(spread / mid)
    }

    /// Total bid size across the top `levels` price levels.
    pub fn bid_volume(&self, levels: usize) -> Decimal {
        self.bids.iter().take(levels).map(|l| l.size).sum()
    }

    /// Total ask size across the top `levels` price levels.
    pub fn ask_volume(&self, levels: usize) -> Decimal {
        self.asks.iter().take(levels).map(|l| l.size).sum()
    }
}

/// A trade idea emitted by a signal generator.
///
/// An intent is a *request*, not an order: it carries the generator's desired
/// notional and confidence, and must pass the risk gate before any order leg
/// is constructed from it. Each intent is consumed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalIntent {
    pub intent_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    /// The price the generator wants to trade at (best bid/ask at evaluation).
    pub target_price: Decimal,
    /// Requested position value in quote currency.
    pub notional_usd: Decimal,
    /// Signal strength in [0, 1].
    pub confidence: Decimal,
    pub strategy: StrategyId,
    pub created_at: DateTime<Utc>,
}

/// A one-shot permission ticket produced by the risk gate.
///
/// The quantity here is authoritative: the gate may have scaled it down from
/// the intent's request. The approval expires at `expires_at`; the execution
/// manager re-checks this immediately before submission and drops stale
/// approvals instead of trading on old prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub approval_id: Uuid,
    pub intent_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub expires_at: DateTime<Utc>,
}

impl Approval {
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// The outcome of running an intent through the risk gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskDecision {
    Approved(Approval),
    Rejected(RejectReason),
}

/// One half of a paired order as tracked by the execution manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity: Decimal,
    pub status: LegStatus,
}

/// A confirmed execution reported by the exchange gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An open position as tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Volume-weighted average entry price.
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub last_updated: DateTime<Utc>,
}

/// A round trip that has been fully or partially closed, with its realized
/// result net of fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Realized profit after the exit fee.
    pub pnl: Decimal,
    pub fee: Decimal,
    pub closed_at: DateTime<Utc>,
}

/// One sample of the account's total equity. The equity curve is an
/// append-only series of these with non-decreasing timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// A regime classification together with the detector's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    /// Confidence in [0, 1]. Always 0 for the fail-soft `Default` regime.
    pub confidence: Decimal,
}
