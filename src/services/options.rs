//! # Per-service registration options.
//!
//! Passed to `provide_with`. Defaults:
//! - component name = service id (tag `component=<id>`)
//! - no extra tags
//! - readiness check named after the component, no timeout, failing the report on error

use std::time::Duration;

use crate::tags::{Tag, TagSet};

/// Readiness check settings for a [`Checkable`](crate::Checkable) service.
#[derive(Clone, Debug, Default)]
pub struct HealthConfig {
    /// Name of the check in the report (`None` = component name).
    pub name: Option<String>,
    /// Per-check timeout (`0s` = no timeout).
    pub timeout: Duration,
    /// When set, a failing check is reported but does not fail the overall report.
    pub skip_on_err: bool,
}

impl HealthConfig {
    /// Returns the timeout as an `Option` (`None` when zero).
    #[inline]
    pub fn check_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }
}

/// Options applied to one service at registration time.
#[derive(Clone, Debug, Default)]
pub struct ServiceOptions {
    pub(crate) name: Option<String>,
    pub(crate) tags: TagSet,
    pub(crate) health: HealthConfig,
}

impl ServiceOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the component name.
    ///
    /// Several services may share a component name; the id stays the unique key.
    /// Also sets the tag `component=<name>`.
    pub fn with_component_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.tags.insert(Tag::new("component", name.clone()));
        self.name = Some(name);
        self
    }

    /// Adds tags to the service.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Sets the readiness check configuration.
    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }
}
