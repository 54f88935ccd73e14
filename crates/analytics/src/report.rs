use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The computed performance metrics for a trading session.
///
/// Ratio metrics use `Option` as a deliberate sentinel: `None` means "not
/// defined for this data" (zero variance, no trades), which is different from
/// a ratio of zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Percentage return on initial capital.
    pub total_return_pct: Decimal,
    /// Per-period Sharpe ratio times the configured annualization factor.
    /// `None` when returns have zero variance or fewer than two samples.
    pub sharpe_ratio: Option<Decimal>,
    /// Largest peak-to-trough equity decline, as a fraction of the peak
    /// (0 = no drawdown, 1 = total loss).
    pub max_drawdown: Decimal,
    /// Percentage of closed trades with positive PnL after fees. `None` when
    /// no trades closed.
    pub win_rate_pct: Option<Decimal>,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub realized_pnl: Decimal,
    pub fees_paid: Decimal,
}

impl PerformanceReport {
    pub fn new() -> Self {
        Self::default()
    }
}
