//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the application runtime.
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → `run` imposes no start deadline
//! - `stop_timeout = 0s` → `run` imposes no stop deadline
//!
//! `App::start` and `App::stop` never impose deadlines themselves: they forward
//! the caller's token. Only `run`/`run_until` derive deadline tokens from this config.

use std::time::Duration;

/// Global configuration for the application runtime.
///
/// ## Field semantics
/// - `start_timeout`: deadline for the start phase of `run` (`0s` = none)
/// - `stop_timeout`: deadline for the stop phase of `run` (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `liveness_path` / `readiness_path` / `metrics_path`: healthz routes (feature `http`)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time the start phase of `run` may take before its token is cancelled.
    ///
    /// Services observe the cancellation through their [`Context`](crate::Context)
    /// and are expected to fail their start promptly.
    pub start_timeout: Duration,

    /// Maximum time the stop phase of `run` may take before its token is cancelled.
    pub stop_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,

    /// Path of the liveness route on the healthz router.
    pub liveness_path: String,

    /// Path of the readiness route on the healthz router.
    pub readiness_path: String,

    /// Path of the Prometheus scrape route on the healthz router.
    pub metrics_path: String,
}

impl Config {
    /// Returns the start deadline of `run` as an `Option`.
    #[inline]
    pub fn start_deadline(&self) -> Option<Duration> {
        non_zero(self.start_timeout)
    }

    /// Returns the stop deadline of `run` as an `Option`.
    #[inline]
    pub fn stop_deadline(&self) -> Option<Duration> {
        non_zero(self.stop_timeout)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d == Duration::ZERO { None } else { Some(d) }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `start_timeout = 0s`, `stop_timeout = 0s` (no deadlines)
    /// - `bus_capacity = 1024`
    /// - `liveness_path = "/live"`, `readiness_path = "/ready"`, `metrics_path = "/metrics"`
    fn default() -> Self {
        Self {
            start_timeout: Duration::ZERO,
            stop_timeout: Duration::ZERO,
            bus_capacity: 1024,
            liveness_path: "/live".to_string(),
            readiness_path: "/ready".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}
