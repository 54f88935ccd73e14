use crate::error::StrategyError;
use crate::Strategy;
use chrono::Utc;
use configuration::ScalpingParams;
use core_types::{MarketSnapshot, OrderSide, SignalIntent, StrategyId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// The order-book scalping generator.
///
/// Watches the top of the book for volume imbalance inside a tight spread.
/// A heavy bid side signals short-term buy pressure (enter at the ask); the
/// reciprocal imbalance signals sell pressure (enter at the bid). The spread
/// itself must be wide enough to clear the configured profit target, yet
/// tight enough that crossing it is cheap.
pub struct Scalping {
    params: ScalpingParams,
    /// Requested position value in quote currency; the risk gate may shrink it.
    default_notional: Decimal,
}

impl Scalping {
    pub fn new(params: ScalpingParams, default_notional: Decimal) -> Result<Self, StrategyError> {
        if params.min_imbalance <= Decimal::ONE {
            return Err(StrategyError::InvalidParameters(
                "min_imbalance must be greater than 1".to_string(),
            ));
        }
        if params.depth_levels == 0 {
            return Err(StrategyError::InvalidParameters(
                "depth_levels must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            params,
            default_notional,
        })
    }

    fn intent(
        &self,
        snapshot: &MarketSnapshot,
        side: OrderSide,
        price: Decimal,
        confidence: Decimal,
    ) -> SignalIntent {
        SignalIntent {
            intent_id: Uuid::new_v4(),
            symbol: snapshot.symbol.clone(),
            side,
            target_price: price,
            notional_usd: self.default_notional.min(self.params.max_position_size_usd),
            confidence: confidence.min(Decimal::ONE),
            strategy: StrategyId::Scalping,
            created_at: Utc::now(),
        }
    }
}

impl Strategy for Scalping {
    fn evaluate(&mut self, snapshot: &MarketSnapshot) -> Result<Option<SignalIntent>, StrategyError> {
        let (Some(bid), Some(ask)) = (snapshot.best_bid(), snapshot.best_ask()) else {
            return Ok(None);
        };
        let Some(spread_pct) = snapshot.spread_pct() else {
            return Ok(None);
        };

        // The spread must be tradeable: tight enough to cross cheaply, wide
        // enough to clear the profit target.
        if spread_pct > self.params.min_spread_pct
            || spread_pct < self.params.min_profit_target_pct
        {
            tracing::trace!(
                symbol = %snapshot.symbol,
                %spread_pct,
                "spread outside tradeable band"
            );
            return Ok(None);
        }

        let bid_volume = snapshot.bid_volume(self.params.depth_levels);
        let ask_volume = snapshot.ask_volume(self.params.depth_levels);
        if bid_volume.is_zero() || ask_volume.is_zero() {
            return Ok(None);
        }

        let imbalance = bid_volume / ask_volume;
        let buy_trigger = self.params.min_imbalance;
        let sell_trigger = Decimal::ONE / self.params.min_imbalance;

        if imbalance >= buy_trigger {
            let confidence = imbalance / (dec!(2) * buy_trigger);
            tracing::debug!(
                symbol = %snapshot.symbol,
                %imbalance,
                %confidence,
                "bid-heavy book, buy signal"
            );
            return Ok(Some(self.intent(snapshot, OrderSide::Buy, ask.price, confidence)));
        }

        if imbalance <= sell_trigger {
            // Mirror of the buy confidence, measured on the ask-heavy ratio.
            let confidence = (ask_volume / bid_volume) / (dec!(2) * buy_trigger);
            tracing::debug!(
                symbol = %snapshot.symbol,
                %imbalance,
                %confidence,
                "ask-heavy book, sell signal"
            );
            return Ok(Some(self.intent(snapshot, OrderSide::Sell, bid.price, confidence)));
        }

        Ok(None)
    }
}
