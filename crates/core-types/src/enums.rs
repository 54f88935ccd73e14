use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order.
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// The execution style of an order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    /// Immediate-or-cancel: fill what is available now, cancel the rest.
    Ioc,
    /// Fill-or-kill: fill the entire quantity now or cancel everything.
    Fok,
}

/// The lifecycle state of a single order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl LegStatus {
    /// A terminal leg never transitions again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LegStatus::Filled | LegStatus::Canceled | LegStatus::Rejected | LegStatus::Expired
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// True for terminal states that ended without a complete fill.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            LegStatus::Canceled | LegStatus::Rejected | LegStatus::Expired
        )
    }
}

/// The market regime classification produced by the detector.
///
/// `Default` is the fail-soft regime: it is reported whenever there is not
/// enough history (or the inputs are degenerate) and maps to the most
/// conservative strategy in the selector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Bullish,
    Bearish,
    Ranging,
    Volatile,
    Default,
}

/// Identifies which signal generator to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyId {
    Scalping,
    Momentum,
    MeanReversion,
}

/// The reason a signal intent was refused by the risk gate or dropped by the
/// execution manager. Each variant has a stable machine-readable code that is
/// carried on the corresponding risk event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    CircuitOpen,
    DrawdownHalt,
    MaxPositions,
    BelowMinNotional,
    DailyLossLimit,
    StaleApproval,
    SlippageAbort,
    LegFailure,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::CircuitOpen => "circuit_open",
            RejectReason::DrawdownHalt => "drawdown_halt",
            RejectReason::MaxPositions => "max_positions",
            RejectReason::BelowMinNotional => "below_min_notional",
            RejectReason::DailyLossLimit => "daily_loss_limit",
            RejectReason::StaleApproval => "stale_approval",
            RejectReason::SlippageAbort => "slippage_abort",
            RejectReason::LegFailure => "leg_failure",
        }
    }
}
