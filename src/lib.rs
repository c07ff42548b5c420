//! # appvisor
//!
//! **Appvisor** is a dependency-injection and lifecycle runtime for long-running
//! Rust services.
//!
//! Services are registered by identifier with a constructor. Constructors
//! register their own dependencies, which records a dependency graph. The
//! runtime then starts the graph in dependency order (concurrently where the
//! graph allows), stops it in reverse order, and aggregates every failure into a
//! tree that names exactly which service failed and why.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   app.provide("api", ..)            constructors call scope.provide(..)
//!            │                                      │
//!            ▼                                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  App (registry + lifecycle driver)                                │
//! │  - Graph (arena of services, deps/dependents edges)               │
//! │  - Bus (broadcast events)                                         │
//! │  - MetricsRegistry (collectors of started services)               │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ Service "db" │◄──│Service "cache"◄──│ Service "api"│   │
//!     │  start once  │   │  start once  │   │  start once  │   │
//!     │  stop once   │   │  stop once   │   │  stop once   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publishes        │ Publishes        │ Publishes       │
//!      │ - Starting       │ - Running        │ - Failed        │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                       ┌───────────┼───────────┐
//!                       ▼           ▼           ▼
//!                   LogWriter  MetricsWriter  custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Constructing ──► Constructed ──► Starting ──► Running ──► Stopping ──► Stopped
//!      │                              │                        │
//!      └──────────────────────────────┴────────► Error ◄───────┘
//!                                          (sticky, carries the error tree)
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                       |
//! |-------------------|-----------------------------------------------------------------|------------------------------------------|
//! | **Registry**      | Register services, record dependencies, drive the lifecycle.    | [`App`], [`Scope`], [`AppBuilder`]       |
//! | **Capabilities**  | Optional behaviors a provided value exposes.                    | [`Component`], [`Runnable`], [`Checkable`] |
//! | **Errors**        | Failure tree per service, typed registry/lifecycle errors.      | [`ServiceError`], [`ProvideError`], [`AppError`] |
//! | **Health**        | Readiness checks gated by service status.                       | [`HealthReport`], [`HealthConfig`]      |
//! | **Metrics**       | Namespaced metricable services and pull-based collectors.       | [`metrics::Metricable`], [`metrics::Collector`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).          | [`Subscribe`], [`MetricsWriter`]         |
//! | **Configuration** | Centralize runtime settings.                                    | [`Config`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `http`: exposes router wiring for [`http::Api`], [`http::Middleware`] and
//!   [`http::Healthz`] services, plus liveness/readiness routes.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{App, BoxError, Component, Config, Context, Runnable};
//!
//! struct Db;
//!
//! #[async_trait]
//! impl Runnable for Db {
//!     async fn start(&self, _ctx: Context) -> Result<(), BoxError> { Ok(()) }
//!     async fn stop(&self, _ctx: Context) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! impl Component for Db {
//!     fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> { Some(self) }
//! }
//!
//! struct Api { db: Arc<Db> }
//! impl Component for Api {}
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::builder(Config::default()).with_name("demo").build();
//!
//!     app.provide("api", |s| {
//!         let db = s.provide("db", |_| Ok(Db))?;
//!         Ok(Api { db })
//!     })?;
//!
//!     // `run` waits for SIGINT/SIGTERM; here the shutdown is immediate.
//!     app.run_until(&CancellationToken::new(), async {}).await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod health;
mod services;
mod subscribers;
mod tags;

pub mod metrics;

// ---- Public re-exports ----

pub use crate::core::{App, AppBuilder, Config, RESERVED_PREFIX, Scope};
pub use error::{AppError, BoxError, ProvideError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use health::{CheckResult, HealthReport};
pub use services::{
    Checkable, Component, Context, HealthConfig, Runnable, ServiceOptions, Status, Taggable,
};
pub use subscribers::{MetricsWriter, Subscribe, SubscriberSet};
pub use tags::{Tag, TagSet, Tagged};

// Optional: router wiring for HTTP-facing services.
// Enable with: `--features http`
#[cfg(feature = "http")]
pub mod http;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
