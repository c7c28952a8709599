//! Failure classification and processing statistics.
//!
//! Provider failures are values, not exceptions: each failed call becomes a
//! [`FetchFailure`] that the executor can classify (rotate key? give up?)
//! and that ultimately lands in the aggregation result's error list. The
//! counters here feed the health endpoint.

mod stats;
mod types;

pub use stats::ProcessingStats;
pub use types::{ErrorType, FetchFailure};
