//! # One node of the service graph.
//!
//! A [`Service`] owns the constructed value (type-erased), its resolved
//! capabilities and the lifecycle bookkeeping:
//!
//! - `status`: atomic [`Status`], sticky once `Error`;
//! - `gate`: async read/write lock. Transitions take it for writing; readiness
//!   checks and the stop gate read the status under it;
//! - `error`: lazily created [`ServiceError`] tree;
//! - `started` / `stopped`: one-shot guards, every caller observes the first outcome;
//! - `stop_done`: level-triggered signal raised once the node's own stop logic is over.
//!
//! Edges are indices into the graph arena: `deps` (what this node needs) and
//! `dependents` (who needs this node).

use std::any::Any;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, ServiceError};
use crate::health::CheckResult;
use crate::services::{Capabilities, Context, HealthConfig, Status};
use crate::tags::TagSet;

/// Outcome shared by every caller of `start`/`stop` on the same node.
pub(crate) type Outcome = Result<(), Arc<ServiceError>>;

pub(crate) struct Service {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub tags: Arc<TagSet>,
    pub health: HealthConfig,
    pub value: Option<Arc<dyn Any + Send + Sync>>,
    pub caps: Capabilities,
    pub deps: Vec<usize>,
    pub dependents: Vec<usize>,
    /// True while the constructor runs, whatever the status.
    pub constructing: bool,

    status: AtomicU8,
    gate: RwLock<()>,
    error: OnceLock<Arc<ServiceError>>,
    pub started: OnceCell<Outcome>,
    pub stopped: OnceCell<Outcome>,
    pub stop_done: CancellationToken,
}

impl Service {
    /// Creates a node in the `Constructing` state.
    pub fn new(id: Arc<str>, name: Arc<str>, tags: TagSet, health: HealthConfig) -> Self {
        Self {
            id,
            name,
            tags: Arc::new(tags),
            health,
            value: None,
            caps: Capabilities::default(),
            deps: Vec::new(),
            dependents: Vec::new(),
            constructing: true,
            status: AtomicU8::new(Status::Constructing as u8),
            gate: RwLock::new(()),
            error: OnceLock::new(),
            started: OnceCell::new(),
            stopped: OnceCell::new(),
            stop_done: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Stores `next` unless the node is already in `Error`.
    pub fn set_status(&self, next: Status) {
        let _ = self
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != Status::Error as u8).then_some(next as u8)
            });
    }

    /// Same as [`set_status`](Self::set_status), serialized with readers of the gate.
    pub async fn transition(&self, next: Status) {
        let _guard = self.gate.write().await;
        self.set_status(next);
    }

    pub fn error(&self) -> Option<Arc<ServiceError>> {
        self.error.get().cloned()
    }

    fn error_tree(&self) -> &Arc<ServiceError> {
        self.error
            .get_or_init(|| Arc::new(ServiceError::new(Arc::clone(&self.id))))
    }

    /// Records a failure and moves the node to `Error`.
    ///
    /// `cause` is ignored when a direct cause is already recorded.
    pub fn fail(&self, cause: Option<BoxError>, deps: Vec<Arc<ServiceError>>) -> Arc<ServiceError> {
        let tree = self.error_tree();
        if let Some(cause) = cause {
            tree.set_cause(cause);
        }
        for dep in deps {
            tree.add_dependency(dep);
        }
        self.set_status(Status::Error);
        Arc::clone(tree)
    }

    /// Same as [`fail`](Self::fail), serialized with readers of the gate.
    pub async fn fail_locked(
        &self,
        cause: Option<BoxError>,
        deps: Vec<Arc<ServiceError>>,
    ) -> Arc<ServiceError> {
        let _guard = self.gate.write().await;
        self.fail(cause, deps)
    }

    /// Context handed to the capabilities of this node.
    pub fn context(&self, token: &CancellationToken) -> Context {
        Context::from_parts(token.child_token(), Arc::clone(&self.id), Arc::clone(&self.tags))
    }

    /// Waits until this node is no longer live (`Starting`, `Running` or `Stopping`).
    ///
    /// Returns immediately for nodes that never started or already finished stopping.
    pub async fn wait_stopped(&self) {
        let live = {
            let _guard = self.gate.read().await;
            self.status().is_live()
        };
        if live {
            self.stop_done.cancelled().await;
        }
    }

    /// Runs the readiness check of this node, gated by its status.
    ///
    /// The status cannot change while the check runs.
    pub async fn check(&self, token: &CancellationToken) -> Option<CheckResult> {
        let checkable = self.caps.checkable.as_ref()?;
        let began = Instant::now();

        let error = {
            let _guard = self.gate.read().await;
            match self.status() {
                Status::Running => {
                    let fut = checkable.ready(self.context(token));
                    match self.health.check_timeout() {
                        Some(limit) => match tokio::time::timeout(limit, fut).await {
                            Ok(res) => res.err().map(|e| e.to_string()),
                            Err(_) => Some(format!("check timed out after {limit:?}")),
                        },
                        None => fut.await.err().map(|e| e.to_string()),
                    }
                }
                Status::Constructing | Status::Constructed => Some("service not started".into()),
                Status::Starting => Some("service starting".into()),
                Status::Stopping => Some("service stopping".into()),
                Status::Stopped => Some("service stopped".into()),
                Status::Error => Some(match self.error() {
                    Some(err) => format!("service in error state: {err}"),
                    None => "service in error state".to_string(),
                }),
            }
        };

        Some(CheckResult {
            name: self
                .health
                .name
                .clone()
                .unwrap_or_else(|| self.name.to_string()),
            service: self.id.to_string(),
            error,
            skip_on_err: self.health.skip_on_err,
            elapsed: began.elapsed(),
        })
    }
}
