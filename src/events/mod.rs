//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the application and its services.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `App` (registration, start/stop/run), service start/stop
//!   fan-out tasks, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `AppBuilder::build`,
//!   which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
