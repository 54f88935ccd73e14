//! # Meridian Strategy Library
//!
//! This crate contains the signal generators for the Meridian engine. It
//! defines a universal `Strategy` trait and three concrete implementations:
//! order-book scalping, MA-crossover momentum, and z-score mean reversion.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   gateways, risk, or execution. It depends only on `core-types` and
//!   `configuration`.
//! - **Generator Agnostic Engine:** By using the `Strategy` trait, the engine
//!   can run whichever generator the regime selector chose without knowing its
//!   internal details.
//! - **Intents, not orders:** a generator's output is a `SignalIntent` — a
//!   request with a notional and a confidence. Sizing authority belongs to the
//!   risk gate.

pub mod error;
pub mod factory;
pub mod mean_reversion;
pub mod momentum;
pub mod scalping;

// Re-export the key components to create a clean, public-facing API.
pub use error::StrategyError;
pub use factory::create_strategy;
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use scalping::Scalping;

// Re-export StrategyId from core_types.
pub use core_types::StrategyId;

use core_types::{MarketSnapshot, SignalIntent};

/// The core trait that all signal generators must implement.
///
/// The `&mut self` in `evaluate` is crucial, as most generators maintain
/// internal state (rolling windows, previous indicator values). The
/// `Send + Sync` bounds allow generators to live inside the per-symbol
/// engine tasks.
pub trait Strategy: Send + Sync {
    /// Evaluates the generator against the latest market snapshot.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(SignalIntent))` - the generator's conditions are met.
    /// * `Ok(None)` - no action should be taken on this snapshot.
    /// * `Err(StrategyError)` - evaluation itself failed.
    fn evaluate(&mut self, snapshot: &MarketSnapshot) -> Result<Option<SignalIntent>, StrategyError>;
}
