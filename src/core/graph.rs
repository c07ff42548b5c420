//! # Service graph: arena of nodes plus the start/stop fan-out.
//!
//! The graph is built single-threaded (through `&mut`) while services are
//! provided, then shared as `Arc<Graph>` by the lifecycle operations.
//!
//! ## Start
//! ```text
//! start(n) ── once ──► error? ──yes──► Err(tree)
//!                        │no
//!                        ▼
//!                    Starting ──► spawn start(dep) for every dep ──► join
//!                                                                    │
//!                     any dep failed ──► Error (tree += dep trees) ◄─┤
//!                                                                    │ all ok
//!                                              runnable.start(ctx) ◄─┘
//!                                                    │
//!                              failed ──► Error ◄────┤ ok
//!                                                    ▼
//!                                   register collector ──► Running
//! ```
//!
//! ## Stop
//! ```text
//! stop(n) ── once ──► error? ──yes──► Err(tree)
//!                       │no
//!                       ▼
//!            wait for every live dependent to finish stopping
//!                       ▼
//!            Stopping ──► runnable.stop(ctx) ──► Stopped | Error
//!                       ▼
//!            raise stop_done ──► spawn stop(dep) for every dep ──► join
//! ```
//!
//! Every node runs its own logic exactly once, whatever the number of callers:
//! concurrent callers await the same one-shot cell and observe the same result.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, ProvideError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::health::HealthReport;
use crate::metrics::MetricsRegistry;
use crate::services::Status;

use super::service::{Outcome, Service};

#[derive(Clone, Copy, Debug)]
enum Phase {
    Start,
    Stop,
}

impl Phase {
    fn as_label(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

pub(crate) struct Graph {
    pub nodes: Vec<Service>,
    index: HashMap<Arc<str>, usize>,
    /// Most recently provided top-level service.
    pub top: Option<usize>,
    pub bus: Bus,
    pub metrics: Arc<MetricsRegistry>,
    sealed: AtomicBool,
}

impl Graph {
    pub fn new(bus: Bus, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            top: None,
            bus,
            metrics,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn insert(&mut self, node: Service) -> usize {
        let idx = self.nodes.len();
        self.index.insert(Arc::clone(&node.id), idx);
        self.nodes.push(node);
        idx
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| &*n.id)
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Records that `from` depends on `to`.
    ///
    /// Rejects the edge when `to` is still under construction (it is an ancestor
    /// of `from`, even one that already failed) or when `from` is reachable from
    /// `to`: `from` is then marked failed with a circular dependency cause. A
    /// failed `to` propagates its tree into `from`.
    pub fn link(&mut self, from: usize, to: usize) -> Result<(), ProvideError> {
        if from == to || self.nodes[to].constructing || self.reaches(to, from) {
            let err = ProvideError::Circular {
                from: self.nodes[from].id.to_string(),
                to: self.nodes[to].id.to_string(),
            };
            self.reject(Some(from), &err);
            return Err(err);
        }

        if self.nodes[from].deps.contains(&to) {
            return Ok(());
        }
        self.nodes[from].deps.push(to);
        self.nodes[to].dependents.push(from);

        if let Some(dep_err) = self.nodes[to].error() {
            let tree = self.nodes[from].fail(None, vec![dep_err]);
            self.publish_failed(from, &tree);
        }
        Ok(())
    }

    /// Returns the value stored for `idx`.
    ///
    /// A type mismatch is recorded on `cursor`, the service asking for the value.
    pub fn value<T: Send + Sync + 'static>(
        &self,
        cursor: Option<usize>,
        idx: usize,
    ) -> Result<Arc<T>, ProvideError> {
        let node = &self.nodes[idx];
        if let Some(error) = node.error() {
            return Err(ProvideError::Unavailable {
                id: node.id.to_string(),
                error,
            });
        }

        match node.value.clone().map(|v| v.downcast::<T>()) {
            Some(Ok(value)) => Ok(value),
            _ => {
                let err = ProvideError::TypeMismatch {
                    id: node.id.to_string(),
                    expected: std::any::type_name::<T>(),
                };
                self.reject(cursor, &err);
                Err(err)
            }
        }
    }

    /// Records `err` as the direct cause of `cursor`, the service that asked.
    pub fn reject(&self, cursor: Option<usize>, err: &ProvideError) {
        if let Some(cur) = cursor {
            let tree = self.nodes[cur].fail(Some(err.to_string().into()), Vec::new());
            self.publish_failed(cur, &tree);
        }
    }

    /// True if `target` is reachable from `start` following `deps` edges.
    fn reaches(&self, start: usize, target: usize) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if idx == target {
                return true;
            }
            if std::mem::replace(&mut visited[idx], true) {
                continue;
            }
            stack.extend(self.nodes[idx].deps.iter().copied());
        }
        false
    }

    pub fn publish(&self, idx: usize, kind: EventKind) {
        self.bus
            .publish(Event::new(kind).with_service(&*self.nodes[idx].id));
    }

    pub fn publish_failed(&self, idx: usize, err: &ServiceError) {
        self.bus.publish(
            Event::new(EventKind::ServiceFailed)
                .with_service(&*self.nodes[idx].id)
                .with_reason(err.to_string()),
        );
    }

    /// Starts `idx` after all of its dependencies, at most once.
    pub fn start(self: Arc<Self>, idx: usize, token: CancellationToken) -> BoxFuture<'static, Outcome> {
        async move {
            self.nodes[idx]
                .started
                .get_or_init(|| self.start_once(idx, &token))
                .await
                .clone()
        }
        .boxed()
    }

    /// Stops `idx` after all of its live dependents, then its dependencies, at most once.
    pub fn stop(self: Arc<Self>, idx: usize, token: CancellationToken) -> BoxFuture<'static, Outcome> {
        async move {
            self.nodes[idx]
                .stopped
                .get_or_init(|| self.stop_once(idx, &token))
                .await
                .clone()
        }
        .boxed()
    }

    async fn start_once(self: &Arc<Self>, idx: usize, token: &CancellationToken) -> Outcome {
        let node = &self.nodes[idx];
        if let Some(err) = node.error() {
            return Err(err);
        }

        node.transition(Status::Starting).await;
        self.publish(idx, EventKind::ServiceStarting);

        let failures = self.fan_out(&node.deps, Phase::Start, token).await;
        if !failures.is_empty() {
            let err = node.fail_locked(None, failures).await;
            self.publish_failed(idx, &err);
            return Err(err);
        }

        if let Some(runnable) = &node.caps.runnable {
            tracing::info!(service.id = %node.id, service.name = %node.name, tags = %node.tags, "Service starting...");
            let started = AssertUnwindSafe(runnable.start(node.context(token)))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(panicked(Phase::Start, payload)));
            if let Err(cause) = started {
                tracing::error!(service.id = %node.id, service.name = %node.name, error = %cause, "Service failed to start");
                let err = node.fail_locked(Some(cause), Vec::new()).await;
                self.publish_failed(idx, &err);
                return Err(err);
            }
            tracing::info!(service.id = %node.id, service.name = %node.name, "Service started successfully");
        }

        if let Some(collector) = &node.caps.collector {
            if let Err(cause) = self.metrics.register(&node.id, Arc::clone(collector)) {
                let err = node.fail_locked(Some(cause.into()), Vec::new()).await;
                self.publish_failed(idx, &err);
                return Err(err);
            }
        }

        node.transition(Status::Running).await;
        self.publish(idx, EventKind::ServiceRunning);
        Ok(())
    }

    async fn stop_once(self: &Arc<Self>, idx: usize, token: &CancellationToken) -> Outcome {
        let node = &self.nodes[idx];
        if let Some(err) = node.error() {
            node.stop_done.cancel();
            return Err(err);
        }

        for &dependent in &node.dependents {
            self.nodes[dependent].wait_stopped().await;
        }

        node.transition(Status::Stopping).await;
        self.publish(idx, EventKind::ServiceStopping);

        if let Some(runnable) = &node.caps.runnable {
            tracing::info!(service.id = %node.id, service.name = %node.name, tags = %node.tags, "Service stopping...");
            let stopped = AssertUnwindSafe(runnable.stop(node.context(token)))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(panicked(Phase::Stop, payload)));
            match stopped {
                Ok(()) => {
                    tracing::info!(service.id = %node.id, service.name = %node.name, "Service successfully stopped");
                }
                Err(cause) => {
                    tracing::error!(service.id = %node.id, service.name = %node.name, error = %cause, "Service failed to stop");
                    let err = node.fail_locked(Some(cause), Vec::new()).await;
                    self.publish_failed(idx, &err);
                }
            }
        }

        if node.error().is_none() {
            node.transition(Status::Stopped).await;
            self.publish(idx, EventKind::ServiceStopped);
        }
        node.stop_done.cancel();

        let failures = self.fan_out(&node.deps, Phase::Stop, token).await;
        if !failures.is_empty() {
            let err = node.fail_locked(None, failures).await;
            self.publish_failed(idx, &err);
        }

        match node.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs `phase` on every edge concurrently and returns the failure trees.
    ///
    /// Capability panics are caught inside the node's own logic. A task that
    /// still fails to join marks its node failed; during stop the node's
    /// completion signal is raised as well so that waiters are released.
    async fn fan_out(
        self: &Arc<Self>,
        edges: &[usize],
        phase: Phase,
        token: &CancellationToken,
    ) -> Vec<Arc<ServiceError>> {
        let handles: Vec<(usize, JoinHandle<Outcome>)> = edges
            .iter()
            .map(|&edge| {
                let graph = Arc::clone(self);
                let fut = match phase {
                    Phase::Start => graph.start(edge, token.clone()),
                    Phase::Stop => graph.stop(edge, token.clone()),
                };
                (edge, tokio::spawn(fut))
            })
            .collect();

        let mut failures = Vec::new();
        for (edge, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push(err),
                Err(join_err) => {
                    let node = &self.nodes[edge];
                    let cause = format!("{} task failed: {join_err}", phase.as_label());
                    let err = node.fail(Some(cause.into()), Vec::new());
                    if matches!(phase, Phase::Stop) {
                        node.stop_done.cancel();
                    }
                    self.publish_failed(edge, &err);
                    failures.push(err);
                }
            }
        }
        failures
    }

    /// Runs every readiness check concurrently; results sorted by name.
    pub async fn ready(&self, token: &CancellationToken) -> HealthReport {
        let results = join_all(self.nodes.iter().map(|n| n.check(token))).await;
        let mut checks: Vec<_> = results.into_iter().flatten().collect();
        checks.sort_by(|a, b| a.name.cmp(&b.name));
        HealthReport { checks }
    }
}

/// Turns a panic caught in a capability into the node's failure cause.
fn panicked(phase: Phase, payload: Box<dyn Any + Send>) -> BoxError {
    let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("{} panicked: {info}", phase.as_label()).into()
}
