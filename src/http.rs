//! # HTTP wiring for provided services (feature `http`).
//!
//! Services opt into the HTTP surface through three capabilities:
//!
//! - [`Api`]: attaches routes to the **main** router;
//! - [`Middleware`]: appends layers to the main [`MiddlewareChain`];
//! - [`Healthz`]: attaches routes to the **healthz** router.
//!
//! The runtime wires them at construction time, in provide order. Serving the
//! routers is left to the caller:
//!
//! ```text
//! provide(...) ──► Api::register_handler(main)
//!              ──► Middleware::register_middleware(chain)
//!              ──► Healthz::register_healthz_handler(healthz)
//!
//! App::main_router()    = chain applied to main
//! App::healthz_router() = healthz + GET liveness_path + GET readiness_path
//!                                 + GET metrics_path
//! ```
//!
//! The liveness route always answers `200 ok`. The readiness route runs every
//! readiness check and answers `200` or `503` with the rendered
//! [`HealthReport`](crate::HealthReport) as body. The metrics route serves
//! [`MetricsRegistry::render`](crate::metrics::MetricsRegistry::render).

use std::sync::Arc;

use axum::Router;

use crate::services::Capabilities;

type Layer = Arc<dyn Fn(Router) -> Router + Send + Sync>;

/// Ordered list of router transformations.
///
/// The first appended layer is the outermost one: it sees requests first.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Layer>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chain with `layer` appended.
    ///
    /// ### Example
    /// ```
    /// use appvisor::http::MiddlewareChain;
    /// use axum::{Router, routing::get};
    ///
    /// let chain = MiddlewareChain::new().append(|router: Router| {
    ///     router.route("/version", get(|| async { "1.0.0" }))
    /// });
    /// assert_eq!(chain.len(), 1);
    /// ```
    #[must_use]
    pub fn append<F>(mut self, layer: F) -> Self
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Returns the chain with every layer of `other` appended.
    #[must_use]
    pub fn extend(mut self, other: MiddlewareChain) -> Self {
        self.layers.extend(other.layers);
        self
    }

    /// Number of layers in the chain.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True if the chain has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Applies the chain to `router`.
    pub fn then(&self, router: Router) -> Router {
        self.layers
            .iter()
            .rev()
            .fold(router, |router, layer| layer(router))
    }
}

/// A service that exposes routes on the main router.
pub trait Api: Send + Sync + 'static {
    /// Returns `router` with the service routes attached.
    fn register_handler(&self, router: Router) -> Router;
}

/// A service that contributes middleware to the main router.
pub trait Middleware: Send + Sync + 'static {
    /// Returns `chain` with the service layers appended.
    fn register_middleware(&self, chain: MiddlewareChain) -> MiddlewareChain;
}

/// A service that exposes routes on the healthz router.
pub trait Healthz: Send + Sync + 'static {
    /// Returns `router` with the service routes attached.
    fn register_healthz_handler(&self, router: Router) -> Router;
}

/// Routers and chain accumulated while services are provided.
#[derive(Default)]
pub(crate) struct HttpWiring {
    pub main: Router,
    pub healthz: Router,
    pub chain: MiddlewareChain,
}

impl HttpWiring {
    pub fn wire(&mut self, caps: &Capabilities) {
        if let Some(api) = &caps.api {
            self.main = api.register_handler(std::mem::take(&mut self.main));
        }
        if let Some(middleware) = &caps.middleware {
            self.chain = middleware.register_middleware(std::mem::take(&mut self.chain));
        }
        if let Some(healthz) = &caps.healthz {
            self.healthz = healthz.register_healthz_handler(std::mem::take(&mut self.healthz));
        }
    }
}
