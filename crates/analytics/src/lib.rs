//! # Meridian Analytics
//!
//! Read-only performance evaluation over the ledger's outputs: the equity
//! curve and the closed-trade history. Nothing here mutates trading state;
//! the evaluator can run on a schedule or on demand without affecting the
//! engine.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::PerformanceEvaluator;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
