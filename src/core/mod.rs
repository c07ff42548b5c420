//! Runtime core: service graph and lifecycle.
//!
//! The public API from this module is [`App`] (with its [`AppBuilder`] and the
//! [`Scope`] handed to constructors) and [`Config`].
//!
//! Internal modules:
//! - [`app`]: registration (`provide`) and whole-graph start/stop/run;
//! - [`graph`]: node arena, edge bookkeeping, concurrent start/stop fan-out;
//! - [`service`]: one node: status state machine, error tree, readiness check;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`config`]: runtime configuration.

mod app;
mod builder;
mod config;
mod graph;
mod service;
mod shutdown;

#[cfg(test)]
mod tests;

pub use app::{App, RESERVED_PREFIX, Scope};
pub use builder::AppBuilder;
pub use config::Config;
