//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; production code should rely on `tracing` output.
//!
//! ## Example output
//! ```text
//! [app-starting]
//! [service-starting] service="db"
//! [service-running] service="db"
//! [service-failed] service="cache" err="service \"cache\": refused"
//! [shutdown-requested]
//! [service-stopped] service="db"
//! [app-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn service(e: &Event) -> &str {
    e.service.as_deref().unwrap_or("unknown")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::AppStarting => println!("[app-starting]"),
            EventKind::AppStarted => println!("[app-started]"),
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::AppStopping => println!("[app-stopping]"),
            EventKind::AppStopped => println!("[app-stopped]"),
            EventKind::ServiceConstructed => {
                println!("[service-constructed] service={:?}", service(e));
            }
            EventKind::ServiceStarting => println!("[service-starting] service={:?}", service(e)),
            EventKind::ServiceRunning => println!("[service-running] service={:?}", service(e)),
            EventKind::ServiceStopping => println!("[service-stopping] service={:?}", service(e)),
            EventKind::ServiceStopped => println!("[service-stopped] service={:?}", service(e)),
            EventKind::ServiceFailed => {
                println!(
                    "[service-failed] service={:?} err={:?}",
                    service(e),
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    service(e),
                    e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={}",
                    service(e),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
