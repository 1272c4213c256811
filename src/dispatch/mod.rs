//! Dispatch engine
//!
//! Concurrent fan-out of one prompt to many providers, with per-branch
//! timeouts, cancellation and order-preserving aggregation.

pub mod aggregator;
pub mod dispatcher;

pub use aggregator::{CompletedUnit, ResultAggregator};
pub use dispatcher::Dispatcher;
