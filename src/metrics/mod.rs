//! # Metrics capabilities and the shared collector registry.
//!
//! Metrics are recorded through the [`metrics`] facade; installing a recorder or
//! exporter is up to the application.
//!
//! - [`Metricable`] values receive `(system, subsystem, tags)` at construction, to
//!   describe their metrics up front.
//! - [`Collector`] values are pull-based: they are registered into the shared
//!   [`MetricsRegistry`] right after a successful start, and publish their
//!   current readings each time [`MetricsRegistry::collect_all`] is called.
//!   [`MetricsRegistry::render`] collects into a private Prometheus recorder and
//!   returns the text exposition; the healthz router serves it (feature `http`).

mod registry;

pub use registry::{Collector, Metricable, MetricsError, MetricsRegistry, sanitize_metric_name};
