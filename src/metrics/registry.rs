use std::sync::{Arc, PoisonError, RwLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use thiserror::Error;

use crate::tags::TagSet;

/// A value that describes its metrics once it knows its namespace.
pub trait Metricable: Send + Sync + 'static {
    /// Called once at construction with the sanitized application name (`system`),
    /// the sanitized component name (`subsystem`) and the service tags.
    fn set_metrics(&self, system: &str, subsystem: &str, tags: &TagSet);
}

/// Pull-based metrics source.
///
/// Both methods record through the `metrics` facade macros
/// (`describe_gauge!`, `gauge!`, `counter!`, ...).
pub trait Collector: Send + Sync + 'static {
    /// Describes the metrics this collector publishes.
    ///
    /// Called on registration and again before every [`MetricsRegistry::render`],
    /// so it must be repeatable.
    fn describe(&self) {}

    /// Publishes current readings. Called on every [`MetricsRegistry::collect_all`]
    /// and [`MetricsRegistry::render`].
    fn collect(&self);
}

/// Errors produced by the metrics registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A collector is already registered under this id.
    #[error("collector {id:?} is already registered")]
    AlreadyRegistered {
        /// The duplicate id.
        id: String,
    },
}

/// Shared registry of pull-based collectors.
///
/// Besides feeding the globally installed recorder through
/// [`collect_all`](Self::collect_all), the registry owns a Prometheus recorder
/// of its own: [`render`](Self::render) collects into it and returns the text
/// exposition, independently of whatever recorder the application installed.
pub struct MetricsRegistry {
    collectors: RwLock<Vec<(String, Arc<dyn Collector>)>>,
    exporter: PrometheusRecorder,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self {
            collectors: RwLock::default(),
            exporter: PrometheusBuilder::new().build_recorder(),
        }
    }
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `collector` under `id` and calls its [`Collector::describe`].
    pub fn register(&self, id: &str, collector: Arc<dyn Collector>) -> Result<(), MetricsError> {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if collectors.iter().any(|(existing, _)| existing == id) {
            return Err(MetricsError::AlreadyRegistered { id: id.to_string() });
        }
        collector.describe();
        collectors.push((id.to_string(), collector));
        Ok(())
    }

    /// Asks every registered collector to publish its readings.
    pub fn collect_all(&self) {
        for collector in self.snapshot() {
            collector.collect();
        }
    }

    /// Collects every registered collector into the registry's own recorder and
    /// returns the Prometheus text exposition.
    pub fn render(&self) -> String {
        let collectors = self.snapshot();
        ::metrics::with_local_recorder(&self.exporter, || {
            for collector in &collectors {
                collector.describe();
                collector.collect();
            }
        });
        self.exporter.handle().render()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, c)| Arc::clone(c))
            .collect()
    }

    /// Returns the ids of registered collectors, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns true if no collector is registered.
    pub fn is_empty(&self) -> bool {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Replaces every character outside `[a-zA-Z0-9_:]` with `_`.
///
/// # Example
/// ```
/// use appvisor::metrics::sanitize_metric_name;
///
/// assert_eq!(sanitize_metric_name("my-app.v2"), "my_app_v2");
/// ```
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
