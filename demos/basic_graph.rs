//! # Example: basic_graph
//!
//! Three services wired through nested `provide` calls, run until Ctrl-C.
//!
//! Demonstrates how to:
//! - Register dependencies from inside a constructor through the [`Scope`].
//! - Expose the [`Runnable`] capability from a [`Component`].
//! - Drive the lifecycle with [`App::run`] and `tracing` output.
//!
//! ## Flow
//! ```text
//! provide("api")
//!     └─► provide("cache")
//!           └─► provide("db")
//!
//! App::run()
//!     ├─► start: db ──► cache ──► api
//!     ├─► wait for SIGINT / SIGTERM / SIGQUIT
//!     └─► stop:  api ──► cache ──► db
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example basic_graph
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use appvisor::{App, BoxError, Component, Config, Context, Runnable, Scope};

/// A service that only prints its transitions.
struct Noisy {
    name: &'static str,
}

#[async_trait]
impl Runnable for Noisy {
    async fn start(&self, ctx: Context) -> Result<(), BoxError> {
        println!("[{}] start (tags: {})", self.name, ctx.tags());
        Ok(())
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        println!("[{}] stop", self.name);
        Ok(())
    }
}

impl Component for Noisy {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }
}

fn cache(s: &mut Scope<'_>) -> Result<Noisy, BoxError> {
    s.provide("db", |_| Ok(Noisy { name: "db" }))?;
    Ok(Noisy { name: "cache" })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut app = App::builder(Config::default())
        .with_name("basic-graph")
        .with_version("0.1.0")
        .build();

    app.provide("api", |s| {
        s.provide("cache", cache)?;
        Ok(Noisy { name: "api" })
    })?;

    println!("services: {:?}; press Ctrl-C to stop", app.service_ids());
    app.run(&CancellationToken::new()).await?;
    Ok(())
}
