use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    core::Config,
    events::Bus,
    metrics::MetricsRegistry,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{app::App, graph::Graph};

/// Builder for constructing an [`App`] with optional features.
pub struct AppBuilder {
    cfg: Config,
    name: String,
    version: Option<String>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl AppBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            name: "app".to_string(),
            version: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the application name.
    ///
    /// Used in logs and, sanitized, as the metrics namespace handed to
    /// [`Metricable`](crate::Metricable) services.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the application version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (service lifecycle, failures, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the App instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for broadcasting
    /// - Metrics registry
    /// - Subscriber workers and the bus listener feeding them
    ///
    /// Must be called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> App {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = if self.subscribers.is_empty() {
            None
        } else {
            let set = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            let stop = CancellationToken::new();
            subscriber_listener(&bus, Arc::clone(&set), stop.clone());
            Some((set, stop.drop_guard()))
        };

        let graph = Graph::new(bus, Arc::new(MetricsRegistry::new()));
        App::from_parts(self.cfg, self.name, self.version, graph, subs)
    }
}

/// Forwards bus events to the subscriber set until `stop` is cancelled.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}
