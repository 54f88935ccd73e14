//! # Meridian Executor
//!
//! Trade execution and account state. This crate owns the two components that
//! touch money: the `ExecutionManager`, which turns approvals into paired
//! order legs and survives their partial failures, and the `Ledger`, which is
//! the only place position and cash state ever changes.
//!
//! ## Architectural Principles
//!
//! - **Gateway abstraction:** the `ExchangeGateway` trait keeps the manager
//!   agnostic about the venue. The `SimulatedGateway` backs tests and dry-run
//!   mode.
//! - **Single mutation entry point:** every confirmed fill goes through
//!   `Ledger::apply_fill`, keyed by client-order-id, so replayed confirmations
//!   are idempotent no-ops.
//! - **Bounded waits:** no order wait outlives the configured timeout. A
//!   timed-out pair is canceled; a half-filled pair is flattened.

pub mod error;
pub mod gateway;
pub mod ledger;
pub mod manager;

// Re-export the key components to provide a clean, public-facing API.
pub use error::{ExecutorError, GatewayError};
pub use gateway::{ExchangeGateway, OrderResult, SimulatedGateway};
pub use ledger::Ledger;
pub use manager::ExecutionManager;
