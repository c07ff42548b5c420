//! # Service values and their optional capabilities.
//!
//! Every value handed to `provide` implements [`Component`]. The trait only has
//! default methods, each one exposing the value as an optional capability:
//!
//! | Accessor     | Capability        | Wired by the runtime                                 |
//! |--------------|-------------------|------------------------------------------------------|
//! | `runnable`   | [`Runnable`]      | `start`/`stop` invoked once, in dependency order     |
//! | `checkable`  | [`Checkable`]     | readiness check, answered only while `Running`       |
//! | `collector`  | [`Collector`]     | registered in the metrics registry after start       |
//! | `metricable` | [`Metricable`]    | receives namespace/subsystem/tags at construction    |
//! | `taggable`   | [`Taggable`]      | receives the service tags at construction            |
//! | `api`        | `Api`             | attaches routes to the main router (`http`)          |
//! | `middleware` | `Middleware`      | extends the main middleware chain (`http`)           |
//! | `healthz`    | `Healthz`         | attaches routes to the healthz router (`http`)       |
//!
//! A plain value opts out of everything with an empty impl:
//! ```
//! use appvisor::Component;
//!
//! struct Settings { url: String }
//! impl Component for Settings {}
//! ```
//!
//! A long-running value forwards the capabilities it implements:
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use appvisor::{BoxError, Component, Context, Runnable};
//!
//! struct Worker;
//!
//! #[async_trait]
//! impl Runnable for Worker {
//!     async fn start(&self, _ctx: Context) -> Result<(), BoxError> { Ok(()) }
//!     async fn stop(&self, _ctx: Context) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! impl Component for Worker {
//!     fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> { Some(self) }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::metrics::{Collector, Metricable};
use crate::services::Context;
use crate::tags::TagSet;

/// A value that maintains long-living task(s).
///
/// The runtime guarantees that:
/// - `start` is called at most once, after every dependency started successfully;
/// - `stop` is called at most once, after every started dependent stopped.
///
/// Both should return an error as soon as possible once `ctx` is cancelled.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Starts the long-living task(s). Return an error if the service cannot start.
    async fn start(&self, ctx: Context) -> Result<(), BoxError>;

    /// Gracefully stops the task(s) and cleans internal state.
    async fn stop(&self, ctx: Context) -> Result<(), BoxError>;
}

/// A value that can report whether it is ready to accept traffic.
#[async_trait]
pub trait Checkable: Send + Sync + 'static {
    /// Returns `Ok(())` when ready.
    ///
    /// Only called while the service is `Running`.
    async fn ready(&self, ctx: Context) -> Result<(), BoxError>;
}

/// A value that wants the service tags attached to its logging/metrics context.
pub trait Taggable: Send + Sync + 'static {
    /// Attaches `tags`. Called once, right after construction.
    fn with_tags(&self, tags: &TagSet);
}

/// Capability table of a provided value.
///
/// See the [module documentation](self) for the list of accessors.
pub trait Component: Send + Sync + 'static {
    /// Exposes the value as a [`Runnable`].
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        None
    }

    /// Exposes the value as a [`Checkable`].
    fn checkable(self: Arc<Self>) -> Option<Arc<dyn Checkable>> {
        None
    }

    /// Exposes the value as a metrics [`Collector`].
    fn collector(self: Arc<Self>) -> Option<Arc<dyn Collector>> {
        None
    }

    /// Exposes the value as a [`Metricable`].
    fn metricable(self: Arc<Self>) -> Option<Arc<dyn Metricable>> {
        None
    }

    /// Exposes the value as a [`Taggable`].
    fn taggable(self: Arc<Self>) -> Option<Arc<dyn Taggable>> {
        None
    }

    /// Exposes the value as an [`Api`](crate::http::Api).
    #[cfg(feature = "http")]
    fn api(self: Arc<Self>) -> Option<Arc<dyn crate::http::Api>> {
        None
    }

    /// Exposes the value as a [`Middleware`](crate::http::Middleware).
    #[cfg(feature = "http")]
    fn middleware(self: Arc<Self>) -> Option<Arc<dyn crate::http::Middleware>> {
        None
    }

    /// Exposes the value as a [`Healthz`](crate::http::Healthz).
    #[cfg(feature = "http")]
    fn healthz(self: Arc<Self>) -> Option<Arc<dyn crate::http::Healthz>> {
        None
    }
}

impl Component for () {}
impl Component for String {}
impl Component for crate::tags::TagSet {}

/// Capabilities of one constructed value, resolved once at construction.
#[derive(Default)]
pub(crate) struct Capabilities {
    pub runnable: Option<Arc<dyn Runnable>>,
    pub checkable: Option<Arc<dyn Checkable>>,
    pub collector: Option<Arc<dyn Collector>>,
    pub metricable: Option<Arc<dyn Metricable>>,
    pub taggable: Option<Arc<dyn Taggable>>,
    #[cfg(feature = "http")]
    pub api: Option<Arc<dyn crate::http::Api>>,
    #[cfg(feature = "http")]
    pub middleware: Option<Arc<dyn crate::http::Middleware>>,
    #[cfg(feature = "http")]
    pub healthz: Option<Arc<dyn crate::http::Healthz>>,
}

impl Capabilities {
    pub fn of<T: Component>(value: &Arc<T>) -> Self {
        Self {
            runnable: Arc::clone(value).runnable(),
            checkable: Arc::clone(value).checkable(),
            collector: Arc::clone(value).collector(),
            metricable: Arc::clone(value).metricable(),
            taggable: Arc::clone(value).taggable(),
            #[cfg(feature = "http")]
            api: Arc::clone(value).api(),
            #[cfg(feature = "http")]
            middleware: Arc::clone(value).middleware(),
            #[cfg(feature = "http")]
            healthz: Arc::clone(value).healthz(),
        }
    }
}
