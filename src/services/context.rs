//! # Context handed to service capabilities.
//!
//! Wraps the caller's [`CancellationToken`] (as a child token) together with the
//! id and tags of the service being invoked. Implementations of
//! [`Runnable`](crate::Runnable) and [`Checkable`](crate::Checkable) should
//! watch the token and return an error as soon as possible once it is cancelled.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::tags::TagSet;

/// Cancellation plus service identity for one capability invocation.
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
    service: Arc<str>,
    tags: Arc<TagSet>,
}

impl Context {
    /// Creates a context for `service`.
    ///
    /// The runtime builds these itself; the constructor is public so that
    /// services can be exercised directly in tests.
    pub fn new(token: CancellationToken, service: impl Into<Arc<str>>, tags: TagSet) -> Self {
        Self {
            token,
            service: service.into(),
            tags: Arc::new(tags),
        }
    }

    pub(crate) fn from_parts(token: CancellationToken, service: Arc<str>, tags: Arc<TagSet>) -> Self {
        Self {
            token,
            service,
            tags,
        }
    }

    /// Returns the cancellation token of this invocation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns true if the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the caller cancels the operation.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Returns the id of the invoked service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the tags of the invoked service.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }
}
