use crate::error::RegimeError;
use configuration::RegimeSettings;
use core_types::{Regime, RegimeReading};
use rust_decimal::prelude::*;
use std::collections::VecDeque;
use ta::indicators::SimpleMovingAverage as Sma;
use ta::Next;

/// Classifies the market regime from a rolling window of mid prices.
///
/// The detector is deliberately forgiving: anything it cannot classify
/// (warm-up, a zero price, a degenerate window) is reported as
/// `Regime::Default` with confidence zero. Callers treat that as "stand
/// aside", so a broken feed quietly stops trading instead of crashing it.
pub struct RegimeDetector {
    short_ma: Sma,
    long_ma: Sma,
    window: usize,
    trend_threshold: f64,
    volatility_threshold: f64,
    /// Simple returns between consecutive observations, bounded at `window`.
    returns: VecDeque<f64>,
    last_mid: Option<f64>,
    observations: usize,
}

impl RegimeDetector {
    pub fn new(params: &RegimeSettings) -> Result<Self, RegimeError> {
        if params.window < 2 {
            return Err(RegimeError::InvalidParameters(
                "regime window must be at least 2".to_string(),
            ));
        }
        let trend_threshold = params
            .trend_threshold
            .to_f64()
            .filter(|t| *t > 0.0)
            .ok_or_else(|| {
                RegimeError::InvalidParameters("trend_threshold must be positive".to_string())
            })?;
        let volatility_threshold = params
            .volatility_threshold
            .to_f64()
            .filter(|t| *t > 0.0)
            .ok_or_else(|| {
                RegimeError::InvalidParameters("volatility_threshold must be positive".to_string())
            })?;

        Ok(Self {
            // Periods are validated at config load; construction cannot fail
            // for a positive period.
            short_ma: Sma::new(params.short_ma_period)
                .map_err(|e| RegimeError::InvalidParameters(e.to_string()))?,
            long_ma: Sma::new(params.long_ma_period)
                .map_err(|e| RegimeError::InvalidParameters(e.to_string()))?,
            window: params.window,
            trend_threshold,
            volatility_threshold,
            returns: VecDeque::with_capacity(params.window),
            last_mid: None,
            observations: 0,
        })
    }

    /// Feeds one mid-price observation and returns the current reading.
    pub fn observe(&mut self, mid: Decimal) -> RegimeReading {
        let Some(mid) = mid.to_f64().filter(|m| m.is_finite() && *m > 0.0) else {
            tracing::warn!(%mid, "unusable mid price, reporting default regime");
            return Self::fail_soft();
        };

        let short = self.short_ma.next(mid);
        let long = self.long_ma.next(mid);

        if let Some(last) = self.last_mid {
            if self.returns.len() == self.window {
                self.returns.pop_front();
            }
            self.returns.push_back(mid / last - 1.0);
        }
        self.last_mid = Some(mid);
        self.observations += 1;

        // Warm-up: both the return window and the long MA must be saturated.
        if self.returns.len() < self.window || self.observations < self.window {
            return Self::fail_soft();
        }

        let volatility = Self::std_dev(&self.returns);
        if !volatility.is_finite() || long <= 0.0 {
            return Self::fail_soft();
        }

        // Volatile wins over any directional reading.
        if volatility > self.volatility_threshold {
            return Self::reading(
                Regime::Volatile,
                (volatility / (2.0 * self.volatility_threshold)).min(1.0),
            );
        }

        let divergence = (short - long) / long;
        if divergence > self.trend_threshold {
            Self::reading(
                Regime::Bullish,
                (divergence / (2.0 * self.trend_threshold)).min(1.0),
            )
        } else if divergence < -self.trend_threshold {
            Self::reading(
                Regime::Bearish,
                (-divergence / (2.0 * self.trend_threshold)).min(1.0),
            )
        } else {
            // The closer the MAs sit together, the more confidently ranging.
            Self::reading(
                Regime::Ranging,
                1.0 - (divergence.abs() / self.trend_threshold).min(1.0),
            )
        }
    }

    fn reading(regime: Regime, confidence: f64) -> RegimeReading {
        let confidence = Decimal::from_f64(confidence.clamp(0.0, 1.0)).unwrap_or(Decimal::ZERO);
        RegimeReading { regime, confidence }
    }

    fn fail_soft() -> RegimeReading {
        RegimeReading {
            regime: Regime::Default,
            confidence: Decimal::ZERO,
        }
    }

    fn std_dev(values: &VecDeque<f64>) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::RegimeSettings;
    use core_types::StrategyId;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn settings() -> RegimeSettings {
        RegimeSettings {
            window: 10,
            short_ma_period: 3,
            long_ma_period: 8,
            trend_threshold: dec!(0.002),
            volatility_threshold: dec!(0.01),
            regime_stability_window: 3,
            mapping: HashMap::new(),
            default_strategy: StrategyId::Scalping,
        }
    }

    #[test]
    fn warm_up_reports_default_with_zero_confidence() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        let reading = detector.observe(dec!(100));
        assert_eq!(reading.regime, Regime::Default);
        assert_eq!(reading.confidence, Decimal::ZERO);
    }

    #[test]
    fn steady_uptrend_classifies_bullish() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        let mut reading = detector.observe(dec!(100));
        let mut price = 100.0_f64;
        for _ in 0..30 {
            price *= 1.004;
            reading = detector.observe(Decimal::from_f64(price).unwrap());
        }
        assert_eq!(reading.regime, Regime::Bullish);
        assert!(reading.confidence > Decimal::ZERO);
    }

    #[test]
    fn steady_downtrend_classifies_bearish() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        let mut reading = detector.observe(dec!(100));
        let mut price = 100.0_f64;
        for _ in 0..30 {
            price *= 0.996;
            reading = detector.observe(Decimal::from_f64(price).unwrap());
        }
        assert_eq!(reading.regime, Regime::Bearish);
    }

    #[test]
    fn flat_market_classifies_ranging_with_high_confidence() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        let mut reading = detector.observe(dec!(100));
        for i in 0..30 {
            // Tiny oscillation well inside both thresholds.
            let price = if i % 2 == 0 { dec!(100.01) } else { dec!(100.00) };
            reading = detector.observe(price);
        }
        assert_eq!(reading.regime, Regime::Ranging);
        assert!(reading.confidence > dec!(0.5));
    }

    #[test]
    fn large_swings_classify_volatile_even_when_trending() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        let mut reading = detector.observe(dec!(100));
        let mut price = 100.0_f64;
        for i in 0..30 {
            // Alternating 3% swings with upward drift.
            price *= if i % 2 == 0 { 1.03 } else { 0.985 };
            reading = detector.observe(Decimal::from_f64(price).unwrap());
        }
        assert_eq!(reading.regime, Regime::Volatile);
    }

    #[test]
    fn zero_price_fails_soft_instead_of_erroring() {
        let mut detector = RegimeDetector::new(&settings()).unwrap();
        for _ in 0..20 {
            detector.observe(dec!(100));
        }
        let reading = detector.observe(Decimal::ZERO);
        assert_eq!(reading.regime, Regime::Default);
        assert_eq!(reading.confidence, Decimal::ZERO);
    }
}
