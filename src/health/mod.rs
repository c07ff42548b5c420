//! # Readiness and liveness reporting.
//!
//! Every service whose value is [`Checkable`](crate::Checkable) gets a readiness
//! check registered at construction. Checks are answered by the value only while
//! the service is `Running`; in every other state the check fails with a
//! message describing that state. See [`App::ready`](crate::App::ready).

mod report;

pub use report::{CheckResult, HealthReport};
