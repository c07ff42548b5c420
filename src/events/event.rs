//! # Runtime events emitted by the application and its services.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Application events**: whole-graph start/stop and shutdown signal
//! - **Service events**: per-node lifecycle transitions and failures
//! - **Subscriber events**: overflow/panic of a subscriber worker
//!
//! The [`Event`] struct carries additional metadata such as timestamps, service id and reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_service("db")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.service.as_deref(), Some("db"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Application events ===
    /// Whole-graph start requested.
    AppStarting,

    /// Whole-graph start completed successfully.
    AppStarted,

    /// Shutdown requested (OS signal or caller-supplied shutdown future).
    ShutdownRequested,

    /// Whole-graph stop requested.
    AppStopping,

    /// Whole-graph stop completed successfully.
    AppStopped,

    // === Service events ===
    /// Constructor returned successfully and capabilities were wired.
    ///
    /// Sets:
    /// - `service`: service id
    ServiceConstructed,

    /// Service entered the `Error` state.
    ///
    /// Sets:
    /// - `service`: service id
    /// - `reason`: rendered error tree
    ServiceFailed,

    /// Service start began (dependencies are being started).
    ///
    /// Sets:
    /// - `service`: service id
    ServiceStarting,

    /// Service started and is running.
    ///
    /// Sets:
    /// - `service`: service id
    ServiceRunning,

    /// Service stop began (every started dependent has stopped).
    ///
    /// Sets:
    /// - `service`: service id
    ServiceStopping,

    /// Service stopped successfully.
    ///
    /// Sets:
    /// - `service`: service id
    ServiceStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service id (or subscriber name for subscriber events), if applicable.
    pub service: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
        }
    }

    /// Attaches a service id.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events about a single service.
    #[inline]
    pub fn is_service_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ServiceConstructed
                | EventKind::ServiceFailed
                | EventKind::ServiceStarting
                | EventKind::ServiceRunning
                | EventKind::ServiceStopping
                | EventKind::ServiceStopped
        )
    }
}
