//! # Service values, capabilities, and per-service settings.
//!
//! This module provides the types application code deals with when providing services:
//! - [`Component`] - capability table every provided value implements
//! - [`Runnable`], [`Checkable`], [`Taggable`] - optional capabilities
//! - [`Context`] - cancellation + identity passed to capabilities
//! - [`ServiceOptions`], [`HealthConfig`] - registration options
//! - [`Status`] - lifecycle state of a service

mod component;
mod context;
mod options;
mod status;

pub(crate) use component::Capabilities;
pub use component::{Checkable, Component, Runnable, Taggable};
pub use context::Context;
pub use options::{HealthConfig, ServiceOptions};
pub use status::Status;
