use crate::error::StrategyError;
use crate::Strategy;
use chrono::Utc;
use configuration::MeanReversionParams;
use core_types::{MarketSnapshot, OrderSide, SignalIntent, StrategyId};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use uuid::Uuid;

/// The z-score mean-reversion generator.
///
/// Maintains a rolling window of mid prices and measures how many standard
/// deviations the current mid sits from the window mean. A deep discount is
/// bought, a rich premium is sold, on the expectation that price reverts to
/// the mean.
pub struct MeanReversion {
    window_size: usize,
    threshold: f64,
    default_notional: Decimal,
    window: VecDeque<f64>,
}

impl MeanReversion {
    pub fn new(
        params: MeanReversionParams,
        default_notional: Decimal,
    ) -> Result<Self, StrategyError> {
        if params.window_size < 2 {
            return Err(StrategyError::InvalidParameters(
                "window_size must be at least 2".to_string(),
            ));
        }
        let threshold = params
            .std_dev_threshold
            .to_f64()
            .filter(|t| *t > 0.0)
            .ok_or_else(|| {
                StrategyError::InvalidParameters(
                    "std_dev_threshold must be positive".to_string(),
                )
            })?;
        Ok(Self {
            window_size: params.window_size,
            threshold,
            default_notional,
            window: VecDeque::with_capacity(params.window_size),
        })
    }

    fn z_score(&self, mid: f64) -> Option<f64> {
        if self.window.len() < self.window_size {
            return None;
        }
        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return None;
        }
        Some((mid - mean) / std_dev)
    }
}

impl Strategy for MeanReversion {
    fn evaluate(&mut self, snapshot: &MarketSnapshot) -> Result<Option<SignalIntent>, StrategyError> {
        let Some(mid) = snapshot.mid_price() else {
            return Ok(None);
        };
        let Some(mid_f64) = mid.to_f64().filter(|m| m.is_finite()) else {
            return Ok(None);
        };

        let z = self.z_score(mid_f64);

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(mid_f64);

        let Some(z) = z else {
            return Ok(None);
        };

        let side = if z <= -self.threshold {
            OrderSide::Buy
        } else if z >= self.threshold {
            OrderSide::Sell
        } else {
            return Ok(None);
        };

        let price = match side {
            OrderSide::Buy => snapshot.best_ask().map(|l| l.price),
            OrderSide::Sell => snapshot.best_bid().map(|l| l.price),
        };
        let Some(price) = price else {
            return Ok(None);
        };

        // Confidence grows with the displacement, saturating at twice the
        // entry threshold.
        let confidence = Decimal::from_f64((z.abs() / (2.0 * self.threshold)).min(1.0))
            .unwrap_or(Decimal::ZERO);

        tracing::debug!(symbol = %snapshot.symbol, z, ?side, "z-score band crossed");

        Ok(Some(SignalIntent {
            intent_id: Uuid::new_v4(),
            symbol: snapshot.symbol.clone(),
            side,
            target_price: price,
            notional_usd: self.default_notional,
            confidence,
            strategy: StrategyId::MeanReversion,
            created_at: Utc::now(),
        }))
    }
}
