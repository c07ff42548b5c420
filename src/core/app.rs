//! # Application: service registry and whole-graph lifecycle.
//!
//! [`App`] owns the service graph. Services are registered with
//! [`App::provide`]; constructors receive a [`Scope`] and register their own
//! dependencies through it, which records the graph edges:
//!
//! ```text
//! app.provide("api", |s| {                 api ──► cache ──► db
//!     let cache = s.provide("cache", |s| {
//!         let db = s.provide("db", open_db)?;
//!         Ok(Cache::new(db))
//!     })?;
//!     Ok(Api::new(cache))
//! })
//! ```
//!
//! - Each id is constructed at most once; later requests return the same `Arc`.
//! - The most recently provided top-level service is the **root** of the lifecycle.
//! - [`App::start`] starts dependencies before dependents, concurrently where the
//!   graph allows; [`App::stop`] runs in reverse order.
//! - [`App::run`] = start, wait for SIGINT/SIGTERM/SIGQUIT, stop.
//!
//! Failures never panic: they are recorded in the [`ServiceError`] tree of the
//! failing service and of everything that depends on it. [`App::error`] exposes
//! the root's tree; `start` returns it.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{AppError, BoxError, ProvideError, ServiceError};
use crate::events::{Event, EventKind};
use crate::health::HealthReport;
use crate::metrics::{MetricsRegistry, sanitize_metric_name};
use crate::services::{Capabilities, Component, ServiceOptions, Status};
use crate::subscribers::SubscriberSet;
use crate::tags::Tag;

use super::builder::AppBuilder;
use super::config::Config;
use super::graph::Graph;
use super::service::Service;
use super::shutdown;

/// Identifier prefix reserved for the runtime.
pub const RESERVED_PREFIX: &str = "system.";

/// # Service registry and lifecycle driver.
///
/// Build with [`App::new`] or [`App::builder`], register services with
/// [`provide`](App::provide), then drive the lifecycle with
/// [`run`](App::run) or [`start`](App::start)/[`stop`](App::stop).
///
/// Registration borrows the app mutably; the lifecycle operations take `&self`
/// and seal the graph: `provide` fails with [`ProvideError::Sealed`] afterwards.
///
/// Dropping the app stops the subscriber listener; subscriber workers exit once
/// their queues are drained.
pub struct App {
    cfg: Config,
    name: String,
    version: Option<String>,
    graph: Arc<Graph>,
    _subs: Option<(Arc<SubscriberSet>, DropGuard)>,
    #[cfg(feature = "http")]
    http: crate::http::HttpWiring,
}

/// Registration handle passed to constructors.
///
/// Every service provided through a scope becomes a dependency of the service
/// whose constructor owns the scope.
pub struct Scope<'a> {
    app: &'a mut App,
    cursor: usize,
}

impl Scope<'_> {
    /// Provides `id` as a dependency of the current service.
    ///
    /// See [`App::provide`].
    pub fn provide<T, F>(&mut self, id: &str, ctor: F) -> Result<Arc<T>, ProvideError>
    where
        T: Component,
        F: FnOnce(&mut Scope<'_>) -> Result<T, BoxError>,
    {
        self.provide_with(id, ServiceOptions::default(), ctor)
    }

    /// Provides `id` with options as a dependency of the current service.
    pub fn provide_with<T, F>(
        &mut self,
        id: &str,
        opts: ServiceOptions,
        ctor: F,
    ) -> Result<Arc<T>, ProvideError>
    where
        T: Component,
        F: FnOnce(&mut Scope<'_>) -> Result<T, BoxError>,
    {
        self.app.provide_node(Some(self.cursor), id, opts, ctor)
    }

    /// Id of the service under construction.
    pub fn service(&self) -> &str {
        match self.app.graph.nodes.get(self.cursor) {
            Some(node) => &*node.id,
            None => "",
        }
    }

    /// Name of the application.
    pub fn app_name(&self) -> &str {
        &self.app.name
    }
}

impl App {
    /// Creates an application without subscribers.
    pub fn new(cfg: Config) -> Self {
        AppBuilder::new(cfg).build()
    }

    /// Returns a builder for an application with name, version and subscribers.
    pub fn builder(cfg: Config) -> AppBuilder {
        AppBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: Config,
        name: String,
        version: Option<String>,
        graph: Graph,
        subs: Option<(Arc<SubscriberSet>, DropGuard)>,
    ) -> Self {
        Self {
            cfg,
            name,
            version,
            graph: Arc::new(graph),
            _subs: subs,
            #[cfg(feature = "http")]
            http: crate::http::HttpWiring::default(),
        }
    }

    /// Registers a top-level service and returns its value.
    ///
    /// - An id seen before returns the existing value; `ctor` is not called.
    /// - An empty id defaults to the type name of `T`.
    /// - Ids starting with `system.` are rejected.
    ///
    /// The most recently provided top-level service becomes the root of
    /// [`start`](App::start)/[`stop`](App::stop).
    ///
    /// ### Example
    /// ```
    /// use appvisor::{App, Config};
    ///
    /// let mut app = App::new(Config::default());
    /// let url = app.provide("url", |_| Ok("postgres://localhost".to_string()))?;
    /// let again = app.provide("url", |_| Ok("never called".to_string()))?;
    ///
    /// assert_eq!(*again, "postgres://localhost");
    /// assert!(std::sync::Arc::ptr_eq(&url, &again));
    /// # Ok::<(), appvisor::ProvideError>(())
    /// ```
    pub fn provide<T, F>(&mut self, id: &str, ctor: F) -> Result<Arc<T>, ProvideError>
    where
        T: Component,
        F: FnOnce(&mut Scope<'_>) -> Result<T, BoxError>,
    {
        self.provide_with(id, ServiceOptions::default(), ctor)
    }

    /// Registers a top-level service with options.
    pub fn provide_with<T, F>(
        &mut self,
        id: &str,
        opts: ServiceOptions,
        ctor: F,
    ) -> Result<Arc<T>, ProvideError>
    where
        T: Component,
        F: FnOnce(&mut Scope<'_>) -> Result<T, BoxError>,
    {
        self.provide_node(None, id, opts, ctor)
    }

    fn provide_node<T, F>(
        &mut self,
        cursor: Option<usize>,
        id: &str,
        opts: ServiceOptions,
        ctor: F,
    ) -> Result<Arc<T>, ProvideError>
    where
        T: Component,
        F: FnOnce(&mut Scope<'_>) -> Result<T, BoxError>,
    {
        let id = if id.is_empty() { std::any::type_name::<T>() } else { id };
        let graph = registering(&mut self.graph, id)?;
        if id.starts_with(RESERVED_PREFIX) {
            let err = ProvideError::Reserved { id: id.to_string() };
            graph.reject(cursor, &err);
            return Err(err);
        }

        if let Some(idx) = graph.lookup(id) {
            if let Some(cur) = cursor {
                graph.link(cur, idx)?;
            }
            return graph.value(cursor, idx);
        }

        let ServiceOptions { name, mut tags, health } = opts;
        let name = name.unwrap_or_else(|| id.to_string());
        if tags.get("component").is_none() {
            tags.insert(Tag::new("component", name.clone()));
        }
        let idx = graph.insert(Service::new(Arc::from(id), Arc::from(name), tags, health));

        let outcome = ctor(&mut Scope { app: self, cursor: idx });

        let graph = registering(&mut self.graph, id)?;
        graph.nodes[idx].constructing = false;
        match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                let caps = Capabilities::of(&value);
                let node = &mut graph.nodes[idx];

                if let Some(taggable) = &caps.taggable {
                    taggable.with_tags(&node.tags);
                }
                if let Some(metricable) = &caps.metricable {
                    metricable.set_metrics(
                        &sanitize_metric_name(&self.name),
                        &sanitize_metric_name(&node.name),
                        &node.tags,
                    );
                }
                #[cfg(feature = "http")]
                self.http.wire(&caps);

                node.value = Some(value as Arc<dyn Any + Send + Sync>);
                node.caps = caps;
                node.set_status(Status::Constructed);
                tracing::debug!(service.id = %node.id, service.name = %node.name, "Service constructed");
                graph.publish(idx, EventKind::ServiceConstructed);
            }
            Err(cause) => {
                // Provide failures were already recorded on this node by `link`/`value`.
                let recorded = cause.downcast_ref::<ProvideError>().is_some();
                let node = &graph.nodes[idx];
                tracing::error!(service.id = %node.id, error = %cause, "Service failed to construct");
                let tree = node.fail((!recorded).then_some(cause), Vec::new());
                graph.publish_failed(idx, &tree);
            }
        }

        match cursor {
            Some(cur) => graph.link(cur, idx)?,
            None => graph.top = Some(idx),
        }
        graph.value(cursor, idx)
    }

    /// Starts the root service and, first, everything it depends on.
    ///
    /// Uses `ctx` as given; no deadline is added. Idempotent: every node runs its
    /// start logic at most once and later calls return the first outcome.
    pub async fn start(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        tracing::info!(app.name = %self.name, "System starting...");
        self.publish(EventKind::AppStarting);

        match self.start_root(ctx).await {
            Ok(()) => {
                tracing::info!(app.name = %self.name, "System successfully started");
                self.publish(EventKind::AppStarted);
                Ok(())
            }
            Err(err) => {
                tracing::error!(app.name = %self.name, error = %err, "System failed to start");
                Err(err)
            }
        }
    }

    async fn start_root(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        let top = self.graph.top.ok_or(AppError::NothingConstructed)?;
        if let Some(err) = self.graph.nodes[top].error() {
            return Err(err.into());
        }
        self.graph.seal();
        Ok(Arc::clone(&self.graph).start(top, ctx.clone()).await?)
    }

    /// Stops the root service, then everything it depends on, in reverse start order.
    ///
    /// A node stops only after every dependent that is starting, running or
    /// stopping has finished stopping. Idempotent like [`start`](App::start).
    pub async fn stop(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        tracing::info!(app.name = %self.name, "System stopping...");
        self.publish(EventKind::AppStopping);

        match self.stop_root(ctx).await {
            Ok(()) => {
                tracing::info!(app.name = %self.name, "System successfully stopped");
                self.publish(EventKind::AppStopped);
                Ok(())
            }
            Err(err) => {
                tracing::error!(app.name = %self.name, error = %err, "System failed to stop");
                Err(err)
            }
        }
    }

    async fn stop_root(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        let top = self.graph.top.ok_or(AppError::NothingConstructed)?;
        self.graph.seal();
        Ok(Arc::clone(&self.graph).stop(top, ctx.clone()).await?)
    }

    /// Starts the application, waits for a termination signal, then stops it.
    ///
    /// Signal listeners are installed only after a successful start and removed
    /// before the stop phase begins. The start and stop phases get the deadlines
    /// of [`Config::start_timeout`] / [`Config::stop_timeout`].
    pub async fn run(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        self.start_within_deadline(ctx).await?;

        let signal = match shutdown::wait_for_shutdown_signal().await {
            Ok(name) => {
                tracing::warn!(app.name = %self.name, signal = name, "Received signal");
                Ok(())
            }
            Err(err) => {
                tracing::error!(app.name = %self.name, error = %err, "Failed to listen for signals");
                Err(AppError::Signal(err))
            }
        };
        self.shutdown(ctx, signal).await
    }

    /// Same as [`run`](App::run), with `shutdown` in place of the OS signals.
    ///
    /// `shutdown` is not polled when the start fails.
    pub async fn run_until<F>(&self, ctx: &CancellationToken, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        self.start_within_deadline(ctx).await?;
        shutdown.await;
        tracing::warn!(app.name = %self.name, "Received shutdown request");
        self.shutdown(ctx, Ok(())).await
    }

    async fn start_within_deadline(&self, ctx: &CancellationToken) -> Result<(), AppError> {
        with_deadline(ctx, self.cfg.start_deadline(), |token| async move {
            self.start(&token).await
        })
        .await
    }

    async fn shutdown(
        &self,
        ctx: &CancellationToken,
        signal: Result<(), AppError>,
    ) -> Result<(), AppError> {
        self.publish(EventKind::ShutdownRequested);
        let stopped = with_deadline(ctx, self.cfg.stop_deadline(), |token| async move {
            self.stop(&token).await
        })
        .await;
        signal.and(stopped)
    }

    /// Failure tree of the root service, if any.
    pub fn error(&self) -> Option<Arc<ServiceError>> {
        self.graph.top.and_then(|top| self.graph.nodes[top].error())
    }

    /// Current status of service `id`.
    pub fn status(&self, id: &str) -> Option<Status> {
        self.graph
            .lookup(id)
            .map(|idx| self.graph.nodes[idx].status())
    }

    /// Ids of every provided service, in registration order.
    pub fn service_ids(&self) -> Vec<String> {
        self.graph.ids().map(str::to_string).collect()
    }

    /// Runs every readiness check concurrently.
    ///
    /// A check runs only while its service is `Running`; other states report a
    /// status message instead.
    pub async fn ready(&self, ctx: &CancellationToken) -> HealthReport {
        self.graph.ready(ctx).await
    }

    /// Liveness: the process is able to answer.
    pub fn live(&self) -> bool {
        true
    }

    /// Registry of the collectors registered by started services.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.graph.metrics
    }

    /// Returns a receiver for the lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.graph.bus.subscribe()
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Application version, if set.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Takes the main router, with the middleware chain applied.
    ///
    /// Routes are those registered by [`Api`](crate::http::Api) services.
    /// Later calls return an empty router.
    #[cfg(feature = "http")]
    pub fn main_router(&mut self) -> axum::Router {
        let router = std::mem::take(&mut self.http.main);
        self.http.chain.then(router)
    }

    /// Takes the healthz router: routes registered by
    /// [`Healthz`](crate::http::Healthz) services plus the liveness, readiness
    /// and Prometheus scrape routes.
    ///
    /// The readiness and scrape handlers share the graph, so the app is sealed afterwards.
    #[cfg(feature = "http")]
    pub fn healthz_router(&mut self) -> axum::Router {
        use axum::http::{StatusCode, header};
        use axum::routing::get;

        self.graph.seal();
        let graph = Arc::clone(&self.graph);
        let scraped = Arc::clone(&self.graph);
        std::mem::take(&mut self.http.healthz)
            .route(&self.cfg.liveness_path, get(|| async { (StatusCode::OK, "ok") }))
            .route(
                &self.cfg.readiness_path,
                get(move || {
                    let graph = Arc::clone(&graph);
                    async move {
                        let report = graph.ready(&CancellationToken::new()).await;
                        let code = if report.is_ok() {
                            StatusCode::OK
                        } else {
                            StatusCode::SERVICE_UNAVAILABLE
                        };
                        (code, report.to_string())
                    }
                }),
            )
            .route(
                &self.cfg.metrics_path,
                get(move || {
                    let graph = Arc::clone(&scraped);
                    async move {
                        (
                            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                            graph.metrics.render(),
                        )
                    }
                }),
            )
    }

    #[cfg(test)]
    pub(crate) fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    fn publish(&self, kind: EventKind) {
        self.graph.bus.publish(Event::new(kind));
    }
}

/// Mutable access to the graph while services are being provided.
fn registering<'g>(graph: &'g mut Arc<Graph>, id: &str) -> Result<&'g mut Graph, ProvideError> {
    let sealed = || ProvideError::Sealed { id: id.to_string() };
    if graph.is_sealed() {
        return Err(sealed());
    }
    Arc::get_mut(graph).ok_or_else(sealed)
}

/// Runs `op` with a child of `ctx` that is cancelled once `limit` elapses.
async fn with_deadline<F, Fut>(ctx: &CancellationToken, limit: Option<Duration>, op: F) -> Fut::Output
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future,
{
    let Some(limit) = limit else {
        return op(ctx.clone()).await;
    };

    let token = ctx.child_token();
    let done = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        let done = done.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => token.cancel(),
                _ = done.cancelled() => {}
            }
        }
    });
    let _timer = done.drop_guard();
    op(token).await
}
