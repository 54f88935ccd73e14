//! # Meridian Market Data
//!
//! The market state cache: the single source of truth for "what does the
//! market look like right now". Gateways push snapshots in; strategies, the
//! regime detector, and the mark-to-market loop read them out.
//!
//! ## Architectural Principles
//!
//! - **Wholesale replacement:** a symbol's state is an `Arc<MarketSnapshot>`
//!   that is swapped atomically. Readers see the old snapshot or the new one,
//!   never a torn mix of both.
//! - **Staleness over errors:** a missing or old snapshot is a reason to skip
//!   an evaluation cycle, not to fail one.

pub mod cache;
pub mod error;

pub use cache::SnapshotStore;
pub use error::MarketDataError;
