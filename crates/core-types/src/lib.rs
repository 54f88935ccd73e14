//! # Meridian Core Types
//!
//! The shared data model for the Meridian trading engine. Every other crate in
//! the workspace speaks in the vocabulary defined here: market snapshots,
//! signal intents, risk decisions, order legs, fills, positions, and equity
//! points.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no dependencies on any other workspace crate.
//! - **Decimal everywhere:** All prices, quantities, and money values are
//!   `rust_decimal::Decimal`. Floating point never touches an account balance.
//! - **Immutable messages:** The structs here are value types that flow through
//!   channels between components. They carry no behavior beyond cheap derived
//!   accessors.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{LegStatus, OrderKind, OrderSide, Regime, RejectReason, StrategyId};
pub use error::CoreError;
pub use structs::{
    Approval, BookLevel, ClosedTrade, EquityPoint, Fill, MarketSnapshot, OrderLeg, Position,
    RegimeReading, RiskDecision, SignalIntent,
};
