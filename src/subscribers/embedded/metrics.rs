//! # MetricsWriter: lifecycle metrics through the `metrics` facade
//!
//! Records, per service:
//! - `appvisor_service_transitions_total{service, status}` (counter)
//! - `appvisor_service_failures_total{service}` (counter)
//! - `appvisor_service_up{service}` (gauge, 1 while running)
//!
//! Nothing is exported unless the application installs a `metrics` recorder.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::services::Status;
use crate::subscribers::Subscribe;

/// Lifecycle metrics subscriber.
pub struct MetricsWriter;

impl Default for MetricsWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsWriter {
    /// Construct a new [`MetricsWriter`], describing its metrics.
    #[must_use]
    pub fn new() -> Self {
        ::metrics::describe_counter!(
            "appvisor_service_transitions_total",
            "Service lifecycle transitions by target status"
        );
        ::metrics::describe_counter!(
            "appvisor_service_failures_total",
            "Services entering the error state"
        );
        ::metrics::describe_gauge!("appvisor_service_up", "1 while the service is running");
        Self
    }
}

fn status_of(kind: EventKind) -> Option<Status> {
    match kind {
        EventKind::ServiceConstructed => Some(Status::Constructed),
        EventKind::ServiceStarting => Some(Status::Starting),
        EventKind::ServiceRunning => Some(Status::Running),
        EventKind::ServiceStopping => Some(Status::Stopping),
        EventKind::ServiceStopped => Some(Status::Stopped),
        EventKind::ServiceFailed => Some(Status::Error),
        _ => None,
    }
}

#[async_trait]
impl Subscribe for MetricsWriter {
    async fn on_event(&self, e: &Event) {
        let (Some(status), Some(service)) = (status_of(e.kind), e.service.as_deref()) else {
            return;
        };
        let service = service.to_string();

        ::metrics::counter!(
            "appvisor_service_transitions_total",
            "service" => service.clone(),
            "status" => status.as_label()
        )
        .increment(1);

        match status {
            Status::Error => {
                ::metrics::counter!("appvisor_service_failures_total", "service" => service.clone())
                    .increment(1);
                ::metrics::gauge!("appvisor_service_up", "service" => service).set(0.0);
            }
            Status::Running => ::metrics::gauge!("appvisor_service_up", "service" => service).set(1.0),
            Status::Stopping => ::metrics::gauge!("appvisor_service_up", "service" => service).set(0.0),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "MetricsWriter"
    }
}
