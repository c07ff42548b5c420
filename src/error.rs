//! Error types used by the appvisor runtime and by provided services.
//!
//! This module defines:
//!
//! - [`ServiceError`]: the failure tree of one service: an optional direct cause
//!   plus the failures of the dependencies that caused it to fail.
//! - [`ProvideError`]: returned by `provide` when the requested value is not available.
//! - [`AppError`]: errors returned by the whole-graph operations (`start`, `stop`, `run`).
//!
//! The enums provide `as_label` helpers for logging/metrics, like the rest of the crate.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use thiserror::Error;

/// Boxed error returned by constructors and capability implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Failure tree of a single service.
///
/// A `ServiceError` always names the service it belongs to. It carries:
/// - an optional **direct cause** (constructor failure, circular dependency,
///   start/stop failure), set at most once;
/// - the failures of the **dependencies** that made this service fail,
///   appended concurrently by the start/stop fan-out.
///
/// ## Rendering
/// ```text
/// service "api"
/// >service "cache"
/// >>service "db": connection refused
/// ```
/// Each dependency level adds one `>` marker. A service that only inherited
/// failures renders its identifier alone.
#[derive(Debug)]
pub struct ServiceError {
    id: Arc<str>,
    direct: OnceLock<BoxError>,
    deps: RwLock<Vec<Arc<ServiceError>>>,
}

impl ServiceError {
    /// Creates an empty tree for `id` (no direct cause, no dependencies yet).
    pub(crate) fn new(id: Arc<str>) -> Self {
        Self {
            id,
            direct: OnceLock::new(),
            deps: RwLock::new(Vec::new()),
        }
    }

    /// Creates a tree for `id` with a direct cause.
    pub(crate) fn with_cause(id: Arc<str>, cause: BoxError) -> Self {
        let err = Self::new(id);
        let _ = err.direct.set(cause);
        err
    }

    /// Returns the identifier of the failed service.
    pub fn service(&self) -> &str {
        &self.id
    }

    /// Returns the direct cause, if this service failed on its own.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.direct.get().map(|e| &**e)
    }

    /// Returns a snapshot of the dependency failures recorded so far.
    pub fn dependencies(&self) -> Vec<Arc<ServiceError>> {
        self.deps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the ids of every service in the tree that carries a direct cause,
    /// depth-first, in recording order.
    ///
    /// # Example
    /// ```text
    /// service "api"            ─┐
    /// >service "cache"          ├─► root_causes() == ["db"]
    /// >>service "db": refused  ─┘
    /// ```
    pub fn root_causes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_root_causes(&mut out);
        out
    }

    fn collect_root_causes(&self, out: &mut Vec<String>) {
        if self.direct.get().is_some() {
            out.push(self.id.to_string());
        }
        for dep in self.dependencies() {
            dep.collect_root_causes(out);
        }
    }

    /// Sets the direct cause unless one is already recorded.
    ///
    /// Returns `false` when a cause was already present (the first one is kept).
    pub(crate) fn set_cause(&self, cause: BoxError) -> bool {
        self.direct.set(cause).is_ok()
    }

    /// Appends the failure tree of a dependency.
    pub(crate) fn add_dependency(&self, err: Arc<ServiceError>) {
        self.deps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direct.get() {
            Some(cause) => write!(f, "service {:?}: {}", &*self.id, cause)?,
            None => write!(f, "service {:?}", &*self.id)?,
        }

        let deps = self.deps.read().unwrap_or_else(PoisonError::into_inner);
        for dep in deps.iter() {
            let rendered = dep.to_string();
            for line in rendered.lines() {
                write!(f, "\n>{line}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.direct
            .get()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

/// # Errors returned by `provide`.
///
/// Every failure that concerns the graph is also recorded in the error tree of
/// the service under construction, so ignoring this value never loses it:
/// `start` reports it later.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ProvideError {
    /// The identifier uses the prefix reserved for the runtime's own services.
    #[error("invalid service id: {id:?} (system.* is reserved for internal use)")]
    Reserved {
        /// The rejected identifier.
        id: String,
    },

    /// Registration was attempted after the lifecycle took hold of the graph.
    #[error("cannot provide {id:?}: the service graph is sealed once the lifecycle has begun")]
    Sealed {
        /// The rejected identifier.
        id: String,
    },

    /// The identifier is already registered with a value of another type.
    #[error("service {id:?} was provided with a type other than {expected}")]
    TypeMismatch {
        /// The conflicting identifier.
        id: String,
        /// The type requested by the caller.
        expected: &'static str,
    },

    /// Requesting `to` from the constructor of `from` would close a cycle.
    ///
    /// The edge is not recorded; `from` is marked failed.
    #[error("circular dependency detected: {from} -> {to}")]
    Circular {
        /// The service under construction.
        from: String,
        /// The requested dependency.
        to: String,
    },

    /// The service failed (constructor error, circular dependency, or failed dependency).
    #[error("service {id:?} is unavailable")]
    Unavailable {
        /// The failed identifier.
        id: String,
        /// The failure tree of that service.
        #[source]
        error: Arc<ServiceError>,
    },
}

impl ProvideError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProvideError::Reserved { .. } => "provide_reserved_id",
            ProvideError::Sealed { .. } => "provide_sealed",
            ProvideError::TypeMismatch { .. } => "provide_type_mismatch",
            ProvideError::Circular { .. } => "provide_circular",
            ProvideError::Unavailable { .. } => "provide_unavailable",
        }
    }
}

/// # Errors produced by whole-graph lifecycle operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AppError {
    /// `start`/`stop` was called before any service was provided.
    #[error("no service constructed yet")]
    NothingConstructed,

    /// The root service (or something it depends on) failed.
    #[error(transparent)]
    Service(#[from] Arc<ServiceError>),

    /// Listening for OS shutdown signals failed.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

impl AppError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::AppError;
    ///
    /// assert_eq!(AppError::NothingConstructed.as_label(), "app_nothing_constructed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::NothingConstructed => "app_nothing_constructed",
            AppError::Service(_) => "app_service_failed",
            AppError::Signal(_) => "app_signal_failed",
        }
    }

    /// Returns the failure tree when the error comes from the service graph.
    pub fn service_error(&self) -> Option<&Arc<ServiceError>> {
        match self {
            AppError::Service(err) => Some(err),
            _ => None,
        }
    }
}
