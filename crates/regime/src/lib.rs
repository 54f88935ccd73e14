//! # Meridian Regime
//!
//! Market regime classification and strategy selection.
//!
//! The `RegimeDetector` is a pure classifier over a rolling window of mid
//! prices: it compares moving-average divergence and return volatility against
//! configured thresholds and reports one of five regimes plus a confidence.
//! It fails soft: degenerate input or insufficient history yields
//! `Regime::Default` with confidence zero, never an error.
//!
//! The `StrategySelector` sits on top and decides *when* a regime change is
//! real: the same regime must be observed for `regime_stability_window`
//! consecutive detections before the active strategy is swapped. This keeps a
//! single noisy detection from thrashing strategies mid-stream.

pub mod detector;
pub mod error;
pub mod selector;

pub use detector::RegimeDetector;
pub use error::RegimeError;
pub use selector::{SelectorDecision, StrategySelector};
