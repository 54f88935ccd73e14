//! # Meridian Risk
//!
//! The risk gate: the single veto point between signal generation and order
//! execution. Every `SignalIntent` passes through `RiskGate::evaluate`, which
//! runs a fixed sequence of checks and either issues a one-shot `Approval`
//! (possibly with a scaled-down size) or returns a coded rejection.
//!
//! ## Architectural Principles
//!
//! - **Ordered short-circuit checks:** circuit breaker, drawdown, position
//!   cap, per-trade risk, daily loss — evaluated in that order, first failure
//!   wins. The ordering is part of the contract: a tripped breaker masks
//!   everything behind it.
//! - **Scale down, don't reject:** an oversized request is shrunk to the
//!   allowed risk budget. Only a request that would shrink below the venue's
//!   minimum notional is refused outright.
//! - **Single writer:** the gate owns all halt state (breaker, drawdown,
//!   daily baseline). Callers share it behind one lock; nothing else mutates
//!   risk state.

pub mod breaker;
pub mod error;
pub mod gate;

pub use breaker::CircuitBreaker;
pub use error::RiskError;
pub use gate::RiskGate;
