use core_types::{Regime, StrategyId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub exchange: ExchangeSettings,
    pub trading: TradingSettings,
    pub risk: RiskSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub regime: RegimeSettings,
    pub strategies: Strategies,
    pub analytics: AnalyticsSettings,
}

/// Identifies the exchange venue the gateway connects to.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSettings {
    /// Venue name, e.g. "hyperliquid".
    pub name: String,
    /// When true, the gateway targets the venue's testnet.
    pub sandbox: bool,
}

/// Engine-wide trading parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSettings {
    /// The symbols to run a trading loop for (e.g. ["BTCUSDT", "ETHUSDT"]).
    pub symbols: Vec<String>,
    /// Starting cash for the ledger, in quote currency.
    pub initial_capital: Decimal,
    /// Default position value requested by signal generators, in USD.
    pub default_trade_amount_usd: Decimal,
    /// Maximum tolerated fractional price move between signal and submission.
    /// 0.001 corresponds to 0.1%.
    pub slippage_tolerance: Decimal,
    /// Hard deadline for a paired order submission, in milliseconds.
    pub order_timeout_ms: u64,
    /// Minimum confidence a signal must carry to reach the risk gate.
    pub confidence_threshold: Decimal,
    /// Minimum spacing between mark-to-market equity points, in seconds.
    pub equity_mark_interval_secs: u64,
    /// A snapshot older than this is considered stale and skipped.
    pub snapshot_staleness_ms: i64,
    /// Taker fee fraction charged by the venue (0.0004 = 0.04%).
    pub taker_fee_pct: Decimal,
}

/// Parameters for the risk gate's ordered checks.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    /// Global cap on simultaneously open positions.
    pub max_open_positions: usize,
    /// Fractional drawdown from peak equity that halts new entries (0.1 = 10%).
    pub max_drawdown_pct: Decimal,
    /// The fraction of total equity that may be at risk on a single trade.
    pub max_risk_per_trade_pct: Decimal,
    /// Distance from entry to stop-loss, as a fraction of entry price.
    pub stop_loss_pct: Decimal,
    /// Distance from entry to take-profit, as a fraction of entry price.
    pub take_profit_pct: Decimal,
    /// Fractional loss since the daily baseline that halts new entries.
    pub daily_loss_limit_pct: Decimal,
    /// Orders scaled below this notional are rejected rather than submitted.
    pub min_order_notional_usd: Decimal,
    /// How long an approval remains valid after the gate issues it.
    pub approval_staleness_ms: u64,
}

/// Parameters for the consecutive-failure circuit breaker.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Consecutive gateway/order failures that trip the breaker.
    pub error_threshold: u32,
    /// Minimum time the breaker stays open before a reset is accepted.
    pub cooldown_secs: u64,
}

/// Parameters for regime detection and strategy selection.
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeSettings {
    /// Number of mid-price observations in the detector's rolling window.
    pub window: usize,
    pub short_ma_period: usize,
    pub long_ma_period: usize,
    /// MA divergence (as a fraction of the long MA) beyond which the market
    /// is trending.
    pub trend_threshold: Decimal,
    /// Return standard deviation beyond which the market is volatile.
    pub volatility_threshold: Decimal,
    /// Consecutive identical detections required before the selector swaps
    /// the active strategy.
    pub regime_stability_window: u32,
    /// Which signal generator serves each regime.
    pub mapping: HashMap<Regime, StrategyId>,
    /// Fallback generator for regimes absent from the mapping.
    pub default_strategy: StrategyId,
}

/// Contains the parameter sets for all available signal generators.
#[derive(Debug, Clone, Deserialize)]
pub struct Strategies {
    pub scalping: ScalpingParams,
    pub momentum: MomentumParams,
    pub mean_reversion: MeanReversionParams,
}

/// Parameters for the order-book scalping generator.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalpingParams {
    /// Only quote when the spread is at most this fraction of mid.
    pub min_spread_pct: Decimal,
    /// Bid/ask volume ratio that signals buy pressure. The sell trigger is
    /// the reciprocal.
    pub min_imbalance: Decimal,
    /// How many book levels to sum when measuring imbalance.
    pub depth_levels: usize,
    /// The spread must offer at least this fractional profit to be worth
    /// crossing.
    pub min_profit_target_pct: Decimal,
    /// Hard cap on the requested position value.
    pub max_position_size_usd: Decimal,
}

/// Parameters for the MA-crossover momentum generator.
#[derive(Debug, Clone, Deserialize)]
pub struct MomentumParams {
    pub short_window: usize,
    pub long_window: usize,
}

/// Parameters for the z-score mean-reversion generator.
#[derive(Debug, Clone, Deserialize)]
pub struct MeanReversionParams {
    pub window_size: usize,
    /// Number of standard deviations from the rolling mean that triggers an
    /// entry.
    pub std_dev_threshold: Decimal,
}

/// Parameters for the performance evaluator.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    /// Multiplier applied to the per-period Sharpe ratio. 1 leaves it
    /// non-annualized.
    pub sharpe_annualization: Decimal,
}

impl RegimeSettings {
    /// Resolves the generator for a regime, falling back to the default.
    pub fn strategy_for(&self, regime: Regime) -> StrategyId {
        self.mapping
            .get(&regime)
            .copied()
            .unwrap_or(self.default_strategy)
    }
}
