//! # Built-in subscribers
//!
//! - [`LogWriter`]: prints events in a human-readable form (demo/debug, feature `logging`).
//! - [`MetricsWriter`]: records lifecycle counters/gauges through the `metrics` facade.

#[cfg(feature = "logging")]
mod log;
mod metrics;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use self::metrics::MetricsWriter;
