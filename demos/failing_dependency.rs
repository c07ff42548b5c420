//! # Example: failing_dependency
//!
//! A dependency fails its start; every dependent inherits the failure.
//!
//! ## Flow
//! ```text
//! App::start()
//!     └─► db.start() ──► Err("connection refused")
//!           ├─► cache: Error (start never invoked)
//!           └─► api:   Error (start never invoked)
//!
//! service "api"
//! >service "cache"
//! >>service "db": connection refused
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example failing_dependency
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use appvisor::{App, BoxError, Component, Config, Context, Runnable};

struct Db;

#[async_trait]
impl Runnable for Db {
    async fn start(&self, _ctx: Context) -> Result<(), BoxError> {
        Err("connection refused".into())
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Component for Db {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut app = App::new(Config::default());
    let provided = app.provide("api", |s| {
        s.provide("cache", |s| {
            s.provide("db", |_| Ok(Db))?;
            Ok(())
        })?;
        Ok(())
    });
    if let Err(err) = provided {
        eprintln!("provide failed: {err}");
        std::process::exit(1);
    }

    if let Err(err) = app.run(&CancellationToken::new()).await {
        eprintln!("{err}");
        if let Some(tree) = err.service_error() {
            eprintln!("root causes: {:?}", tree.root_causes());
        }
        for id in app.service_ids() {
            eprintln!("{id}: {:?}", app.status(&id));
        }
        std::process::exit(1);
    }
}
