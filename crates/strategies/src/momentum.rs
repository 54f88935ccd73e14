use crate::error::StrategyError;
use crate::Strategy;
use chrono::Utc;
use configuration::MomentumParams;
use core_types::{MarketSnapshot, OrderSide, SignalIntent, StrategyId};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use ta::indicators::SimpleMovingAverage as Sma;
use ta::Next;
use uuid::Uuid;

/// The moving-average crossover momentum generator.
pub struct Momentum {
    ma_short: Sma,
    ma_long: Sma,
    default_notional: Decimal,
    // State: the previous MA values, to detect the crossover event itself
    // rather than the persistent condition.
    prev_short_ma: Option<Decimal>,
    prev_long_ma: Option<Decimal>,
    warmup_remaining: usize,
}

impl Momentum {
    pub fn new(params: MomentumParams, default_notional: Decimal) -> Result<Self, StrategyError> {
        if params.short_window >= params.long_window {
            return Err(StrategyError::InvalidParameters(
                "short_window must be less than long_window".to_string(),
            ));
        }
        Ok(Self {
            ma_short: Sma::new(params.short_window)
                .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?,
            ma_long: Sma::new(params.long_window)
                .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?,
            default_notional,
            prev_short_ma: None,
            prev_long_ma: None,
            warmup_remaining: params.long_window,
        })
    }
}

impl Strategy for Momentum {
    /// A buy intent fires when the short MA crosses above the long MA; a sell
    /// intent when it crosses below. Until the long window has seen enough
    /// observations the generator stays silent.
    fn evaluate(&mut self, snapshot: &MarketSnapshot) -> Result<Option<SignalIntent>, StrategyError> {
        let Some(mid) = snapshot.mid_price() else {
            return Ok(None);
        };
        // The `ta` crate uses `f64`. This is a controlled and accepted
        // precision trade-off for using the library.
        let Some(mid_f64) = mid.to_f64().filter(|m| m.is_finite()) else {
            return Ok(None);
        };

        let short = self.ma_short.next(mid_f64);
        let long = self.ma_long.next(mid_f64);
        let (Some(current_short), Some(current_long)) =
            (Decimal::from_f64(short), Decimal::from_f64(long))
        else {
            return Ok(None);
        };

        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            self.prev_short_ma = Some(current_short);
            self.prev_long_ma = Some(current_long);
            return Ok(None);
        }

        let mut intent = None;

        if let (Some(prev_short), Some(prev_long)) = (self.prev_short_ma, self.prev_long_ma) {
            let crossed_up = prev_short <= prev_long && current_short > current_long;
            let crossed_down = prev_short >= prev_long && current_short < current_long;

            let side = if crossed_up {
                Some(OrderSide::Buy)
            } else if crossed_down {
                Some(OrderSide::Sell)
            } else {
                None
            };

            if let Some(side) = side {
                let price = match side {
                    OrderSide::Buy => snapshot.best_ask().map(|l| l.price),
                    OrderSide::Sell => snapshot.best_bid().map(|l| l.price),
                };
                if let Some(price) = price {
                    tracing::debug!(
                        symbol = %snapshot.symbol,
                        ?side,
                        %current_short,
                        %current_long,
                        "MA crossover"
                    );
                    intent = Some(SignalIntent {
                        intent_id: Uuid::new_v4(),
                        symbol: snapshot.symbol.clone(),
                        side,
                        target_price: price,
                        notional_usd: self.default_notional,
                        confidence: dec!(1.0), // Full confidence on a clean crossover.
                        strategy: StrategyId::Momentum,
                        created_at: Utc::now(),
                    });
                }
            }
        }

        self.prev_short_ma = Some(current_short);
        self.prev_long_ma = Some(current_long);

        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::BookLevel;

    fn snapshot(mid: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETHUSDT".to_string(),
            bids: vec![BookLevel { price: mid - dec!(0.05), size: dec!(1) }],
            asks: vec![BookLevel { price: mid + dec!(0.05), size: dec!(1) }],
            timestamp: Utc::now(),
        }
    }

    fn params() -> MomentumParams {
        MomentumParams {
            short_window: 2,
            long_window: 4,
        }
    }

    #[test]
    fn inverted_windows_are_rejected() {
        let bad = MomentumParams {
            short_window: 4,
            long_window: 4,
        };
        assert!(Momentum::new(bad, dec!(10)).is_err());
    }

    #[test]
    fn upward_crossover_emits_buy() {
        let mut strategy = Momentum::new(params(), dec!(10)).unwrap();
        // Decline first so the short MA sits below the long MA, then reverse.
        let prices = [
            dec!(110), dec!(108), dec!(106), dec!(104), dec!(102), dec!(100),
            dec!(108), dec!(118),
        ];
        let mut emitted = Vec::new();
        for price in prices {
            if let Some(intent) = strategy.evaluate(&snapshot(price)).unwrap() {
                emitted.push(intent);
            }
        }
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].side, OrderSide::Buy);
        assert_eq!(emitted[0].strategy, StrategyId::Momentum);
        assert_eq!(emitted[0].confidence, dec!(1.0));
    }

    #[test]
    fn downward_crossover_emits_sell() {
        let mut strategy = Momentum::new(params(), dec!(10)).unwrap();
        let prices = [
            dec!(100), dec!(102), dec!(104), dec!(106), dec!(108), dec!(110),
            dec!(102), dec!(92),
        ];
        let mut emitted = Vec::new();
        for price in prices {
            if let Some(intent) = strategy.evaluate(&snapshot(price)).unwrap() {
                emitted.push(intent);
            }
        }
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].side, OrderSide::Sell);
    }

    #[test]
    fn steady_trend_without_crossover_is_silent() {
        let mut strategy = Momentum::new(params(), dec!(10)).unwrap();
        for i in 0..20 {
            let price = dec!(100) + Decimal::from(i);
            // Short MA stays above long MA the whole way up after warm-up.
            let intent = strategy.evaluate(&snapshot(price)).unwrap();
            if i > 6 {
                assert!(intent.is_none());
            }
        }
    }
}
