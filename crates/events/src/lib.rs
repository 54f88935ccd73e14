//! # Meridian Events
//!
//! This crate defines the structured events the engine broadcasts to
//! observers: risk actions, regime changes, order outcomes, and portfolio
//! snapshots. The broadcast channel is deliberately lossy for slow consumers;
//! the trading path never blocks on an observer.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the
//! definitive language for everything that leaves the engine.

pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{EngineEvent, OrderOutcome, PortfolioState, RegimeChange, RiskEvent};
