//! # Event subscribers for the appvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and built-in implementations for lifecycle events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! provide()/start()/stop() ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                         │
//!                                                         ┌───────────────┼──────────────┐
//!                                                         ▼               ▼              ▼
//!                                                     LogWriter     MetricsWriter     Custom
//! ```

mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use embedded::MetricsWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
