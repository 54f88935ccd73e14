use crate::error::StrategyError;
use crate::{MeanReversion, Momentum, Scalping, Strategy};
use configuration::{Strategies, TradingSettings};
use core_types::StrategyId;

/// Constructs a boxed generator from its identifier and parameter blocks.
///
/// This is the single place that maps `StrategyId` to a concrete type; the
/// engine swaps generators through this function when the regime selector
/// fires.
pub fn create_strategy(
    id: StrategyId,
    params: &Strategies,
    trading: &TradingSettings,
) -> Result<Box<dyn Strategy>, StrategyError> {
    let notional = trading.default_trade_amount_usd;
    match id {
        StrategyId::Scalping => Ok(Box::new(Scalping::new(params.scalping.clone(), notional)?)),
        StrategyId::Momentum => Ok(Box::new(Momentum::new(params.momentum.clone(), notional)?)),
        StrategyId::MeanReversion => Ok(Box::new(MeanReversion::new(
            params.mean_reversion.clone(),
            notional,
        )?)),
    }
}
