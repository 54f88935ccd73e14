use configuration::RegimeSettings;
use core_types::{Regime, RegimeReading, StrategyId};

/// What the selector concluded from one detector reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectorDecision {
    /// Keep running the current generator.
    Hold,
    /// The regime has been stable long enough: swap to this generator.
    Swap {
        from: Regime,
        to: Regime,
        strategy: StrategyId,
    },
}

/// Debounces regime readings into strategy swaps.
///
/// A candidate regime must be observed for `regime_stability_window`
/// *consecutive* detections before the swap fires. Any differing detection
/// resets the streak, so one noisy reading cannot flip the strategy. The
/// caller finishes any in-flight evaluation under the old generator; the swap
/// only affects subsequent cycles.
pub struct StrategySelector {
    active_regime: Regime,
    active_strategy: StrategyId,
    candidate: Option<Regime>,
    streak: u32,
    stability_window: u32,
    settings: RegimeSettings,
}

impl StrategySelector {
    pub fn new(settings: RegimeSettings) -> Self {
        let active_regime = Regime::Default;
        Self {
            active_regime,
            active_strategy: settings.strategy_for(active_regime),
            candidate: None,
            streak: 0,
            stability_window: settings.regime_stability_window,
            settings,
        }
    }

    pub fn active_strategy(&self) -> StrategyId {
        self.active_strategy
    }

    pub fn active_regime(&self) -> Regime {
        self.active_regime
    }

    /// Feeds one detector reading and reports whether to swap generators.
    pub fn on_reading(&mut self, reading: RegimeReading) -> SelectorDecision {
        if reading.regime == self.active_regime {
            // Back on the active regime: any pending candidate is abandoned.
            self.candidate = None;
            self.streak = 0;
            return SelectorDecision::Hold;
        }

        match self.candidate {
            Some(candidate) if candidate == reading.regime => {
                self.streak += 1;
            }
            _ => {
                self.candidate = Some(reading.regime);
                self.streak = 1;
            }
        }

        if self.streak < self.stability_window {
            return SelectorDecision::Hold;
        }

        let from = self.active_regime;
        let to = reading.regime;
        let strategy = self.settings.strategy_for(to);

        self.active_regime = to;
        self.active_strategy = strategy;
        self.candidate = None;
        self.streak = 0;

        tracing::info!(?from, ?to, ?strategy, "regime stabilized, swapping strategy");
        SelectorDecision::Swap { from, to, strategy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn settings(stability_window: u32) -> RegimeSettings {
        RegimeSettings {
            window: 10,
            short_ma_period: 3,
            long_ma_period: 8,
            trend_threshold: dec!(0.002),
            volatility_threshold: dec!(0.01),
            regime_stability_window: stability_window,
            mapping: HashMap::from([
                (Regime::Bullish, StrategyId::Momentum),
                (Regime::Ranging, StrategyId::MeanReversion),
                (Regime::Default, StrategyId::Scalping),
            ]),
            default_strategy: StrategyId::Scalping,
        }
    }

    fn reading(regime: Regime) -> RegimeReading {
        RegimeReading {
            regime,
            confidence: dec!(0.9),
        }
    }

    #[test]
    fn swap_requires_full_stability_window() {
        let mut selector = StrategySelector::new(settings(3));
        assert_eq!(selector.active_strategy(), StrategyId::Scalping);

        assert_eq!(selector.on_reading(reading(Regime::Bullish)), SelectorDecision::Hold);
        assert_eq!(selector.on_reading(reading(Regime::Bullish)), SelectorDecision::Hold);
        assert_eq!(
            selector.on_reading(reading(Regime::Bullish)),
            SelectorDecision::Swap {
                from: Regime::Default,
                to: Regime::Bullish,
                strategy: StrategyId::Momentum,
            }
        );
        assert_eq!(selector.active_strategy(), StrategyId::Momentum);
    }

    #[test]
    fn interrupted_streak_resets_the_counter() {
        let mut selector = StrategySelector::new(settings(3));
        selector.on_reading(reading(Regime::Bullish));
        selector.on_reading(reading(Regime::Bullish));
        // A single differing detection wipes the progress.
        selector.on_reading(reading(Regime::Default));

        assert_eq!(selector.on_reading(reading(Regime::Bullish)), SelectorDecision::Hold);
        assert_eq!(selector.on_reading(reading(Regime::Bullish)), SelectorDecision::Hold);
        assert!(matches!(
            selector.on_reading(reading(Regime::Bullish)),
            SelectorDecision::Swap { .. }
        ));
    }

    #[test]
    fn switching_candidates_restarts_the_streak() {
        let mut selector = StrategySelector::new(settings(2));
        selector.on_reading(reading(Regime::Bullish));
        selector.on_reading(reading(Regime::Ranging));
        // Ranging only has a streak of 1; a second is required.
        assert!(matches!(
            selector.on_reading(reading(Regime::Ranging)),
            SelectorDecision::Swap {
                to: Regime::Ranging,
                ..
            }
        ));
        assert_eq!(selector.active_strategy(), StrategyId::MeanReversion);
    }

    #[test]
    fn unmapped_regime_swaps_to_default_strategy() {
        let mut selector = StrategySelector::new(settings(1));
        let decision = selector.on_reading(reading(Regime::Volatile));
        assert_eq!(
            decision,
            SelectorDecision::Swap {
                from: Regime::Default,
                to: Regime::Volatile,
                strategy: StrategyId::Scalping,
            }
        );
    }
}
