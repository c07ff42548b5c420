//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for service lifecycle transitions.
//! - Wire the subscriber into [`App::builder`].
//!
//! ## Flow
//! ```text
//! App::run_until()
//!     ├─► publish(AppStarting)
//!     ├─► db / api: publish(ServiceStarting / ServiceRunning)
//!     ├─► publish(ShutdownRequested)
//!     ├─► api / db: publish(ServiceStopping / ServiceStopped)
//!     └─► subscriber_listener
//!           └─► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use appvisor::{App, BoxError, Component, Config, Context, Event, EventKind, Runnable, Subscribe};

/// A simple console subscriber that prints selected events.
struct ConsoleSubscriber;

#[async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let service = ev.service.as_deref().unwrap_or("<app>");
        match ev.kind {
            EventKind::ServiceStarting => println!("[sub] starting: service={service}"),
            EventKind::ServiceRunning => println!("[sub] running:  service={service}"),
            EventKind::ServiceStopping => println!("[sub] stopping: service={service}"),
            EventKind::ServiceStopped => println!("[sub] stopped:  service={service}"),
            EventKind::ServiceFailed => println!(
                "[sub] failed:   service={service} reason={}",
                ev.reason.as_deref().unwrap_or("<none>")
            ),
            EventKind::ShutdownRequested => println!("[sub] shutdown requested"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

struct Ticker {
    every: Duration,
    stop: CancellationToken,
}

#[async_trait]
impl Runnable for Ticker {
    async fn start(&self, _ctx: Context) -> Result<(), BoxError> {
        let (every, stop) = (self.every, self.stop.clone());
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(every) => println!("[ticker] tick"),
                }
            }
        });
        Ok(())
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        self.stop.cancel();
        Ok(())
    }
}

impl Component for Ticker {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleSubscriber)];
    let mut app = App::builder(Config::default())
        .with_name("custom-subscriber")
        .with_subscribers(subs)
        .build();

    app.provide("api", |s| {
        s.provide("ticker", |_| {
            Ok(Ticker {
                every: Duration::from_millis(100),
                stop: CancellationToken::new(),
            })
        })?;
        Ok(())
    })?;

    app.run_until(&CancellationToken::new(), tokio::time::sleep(Duration::from_millis(350)))
        .await?;

    // Let the subscriber worker drain its queue before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
