use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, BoxError, ProvideError};
use crate::events::EventKind;
use crate::metrics::{Collector, Metricable};
use crate::services::{
    Checkable, Component, Context, HealthConfig, Runnable, ServiceOptions, Status, Taggable,
};
use crate::tags::{Tag, TagSet, Tagged};

use super::{App, Config};

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not recorded"))
    }

    fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

struct Probe {
    id: &'static str,
    journal: Journal,
    fail_start: Option<&'static str>,
    fail_stop: Option<&'static str>,
    stop_delay: Duration,
    healthy: AtomicBool,
}

impl Probe {
    fn new(id: &'static str, journal: Journal) -> Self {
        Self {
            id,
            journal,
            fail_start: None,
            fail_stop: None,
            stop_delay: Duration::ZERO,
            healthy: AtomicBool::new(true),
        }
    }

    fn fail_with(mut self, cause: Option<&'static str>) -> Self {
        self.fail_start = cause;
        self
    }

    fn fail_stop_with(mut self, cause: &'static str) -> Self {
        self.fail_stop = Some(cause);
        self
    }

    fn slow_stop(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Runnable for Probe {
    async fn start(&self, _ctx: Context) -> Result<(), BoxError> {
        self.journal.push(format!("start:{}", self.id));
        match self.fail_start {
            Some(cause) => Err(cause.into()),
            None => Ok(()),
        }
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        self.journal.push(format!("stop:{}", self.id));
        match self.fail_stop {
            Some(cause) => Err(cause.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Checkable for Probe {
    async fn ready(&self, _ctx: Context) -> Result<(), BoxError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("not healthy".into())
        }
    }
}

impl Component for Probe {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }

    fn checkable(self: Arc<Self>) -> Option<Arc<dyn Checkable>> {
        Some(self)
    }
}

/// Provides `api -> cache -> db`, `db` failing its start with `db_failure`.
fn provide_chain(
    app: &mut App,
    journal: &Journal,
    db_failure: Option<&'static str>,
) -> Result<Arc<Probe>, ProvideError> {
    let journal = journal.clone();
    app.provide("api", move |s| {
        let for_cache = journal.clone();
        s.provide("cache", move |s| {
            let for_db = for_cache.clone();
            s.provide("db", move |_| Ok(Probe::new("db", for_db).fail_with(db_failure)))?;
            Ok(Probe::new("cache", for_cache))
        })?;
        Ok(Probe::new("api", journal))
    })
}

#[tokio::test]
async fn provide_constructs_each_id_once() {
    let mut app = App::new(Config::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = {
        let calls = Arc::clone(&calls);
        app.provide("settings", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("postgres://localhost".to_string())
        })
        .unwrap()
    };
    let second = {
        let calls = Arc::clone(&calls);
        app.provide("settings", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("other".to_string())
        })
        .unwrap()
    };

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(app.service_ids(), vec!["settings".to_string()]);
}

#[tokio::test]
async fn shared_dependency_is_constructed_once() {
    let mut app = App::new(Config::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let c = Arc::clone(&calls);
    app.provide("root", move |s| {
        let left = {
            let c = Arc::clone(&c);
            s.provide("shared", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(TagSet::new())
            })?
        };
        let right: Arc<TagSet> = s.provide("shared", |_| Err("constructed twice".into()))?;
        assert!(Arc::ptr_eq(&left, &right));
        Ok(())
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let graph = app.graph();
    assert_eq!(graph.nodes[0].deps, vec![1]);
    assert_eq!(graph.nodes[1].dependents, vec![0]);
}

#[tokio::test]
async fn empty_id_defaults_to_type_name() {
    let mut app = App::new(Config::default());
    app.provide("", |_| Ok(String::from("value"))).unwrap();

    assert_eq!(app.service_ids(), vec![std::any::type_name::<String>().to_string()]);
}

#[tokio::test]
async fn circular_dependency_fails_the_requesting_service() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();

    let j = journal.clone();
    let res = app.provide("a", move |s| {
        let j_b = j.clone();
        s.provide("b", move |s| {
            let back: Result<Arc<Probe>, ProvideError> =
                s.provide("a", |_| Err("constructed twice".into()));
            assert!(matches!(back, Err(ProvideError::Circular { .. })));
            back?;
            Ok(Probe::new("b", j_b))
        })?;
        Ok(Probe::new("a", j))
    });

    assert!(matches!(res, Err(ProvideError::Unavailable { .. })));
    let err = app.error().expect("root carries the cycle");
    assert_eq!(
        err.to_string(),
        "service \"a\"\n>service \"b\": circular dependency detected: b -> a"
    );

    // The rejected edge is not recorded.
    let graph = app.graph();
    let b = graph.lookup("b").unwrap();
    assert!(graph.nodes[b].deps.is_empty());
    assert_eq!(app.status("b"), Some(Status::Error));
}

#[tokio::test]
async fn back_edge_to_a_failed_ancestor_is_circular() {
    let mut app = App::new(Config::default());

    app.provide("a", |s| {
        // Fails "a" while its constructor keeps going.
        let _ = s.provide("system.x", |_| Ok(()));
        s.provide("b", |s| {
            let back: Result<Arc<()>, ProvideError> =
                s.provide("a", |_| Err("constructed twice".into()));
            assert!(matches!(back, Err(ProvideError::Circular { .. })));
            back?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    let graph = app.graph();
    let b = graph.lookup("b").unwrap();
    assert!(graph.nodes[b].deps.is_empty());
    assert_eq!(
        graph.nodes[b].error().unwrap().to_string(),
        r#"service "b": circular dependency detected: b -> a"#
    );
}

#[tokio::test]
async fn starts_dependencies_first_and_stops_in_reverse() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, None).unwrap();

    let token = CancellationToken::new();
    app.start(&token).await.unwrap();
    assert_eq!(journal.entries(), ["start:db", "start:cache", "start:api"]);
    for id in ["db", "cache", "api"] {
        assert_eq!(app.status(id), Some(Status::Running));
    }

    app.stop(&token).await.unwrap();
    assert_eq!(
        journal.entries()[3..],
        ["stop:api", "stop:cache", "stop:db"]
    );
    for id in ["db", "cache", "api"] {
        assert_eq!(app.status(id), Some(Status::Stopped));
    }
}

#[tokio::test]
async fn failing_dependency_fails_every_dependent() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, Some("connection refused")).unwrap();

    let err = app.start(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(journal.entries(), ["start:db"]);
    for id in ["db", "cache", "api"] {
        assert_eq!(app.status(id), Some(Status::Error));
    }

    let tree = err.service_error().unwrap();
    assert_eq!(
        tree.to_string(),
        "service \"api\"\n>service \"cache\"\n>>service \"db\": connection refused"
    );
    assert_eq!(tree.root_causes(), vec!["db".to_string()]);
    assert!(Arc::ptr_eq(tree, &app.error().unwrap()));
}

#[tokio::test]
async fn start_runs_side_effects_once() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, None).unwrap();

    let token = CancellationToken::new();
    app.start(&token).await.unwrap();
    app.start(&token).await.unwrap();

    assert_eq!(journal.count("start:db"), 1);
    assert_eq!(journal.count("start:api"), 1);
}

#[tokio::test]
async fn failed_start_returns_the_same_error_twice() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, Some("boom")).unwrap();

    let token = CancellationToken::new();
    let first = app.start(&token).await.unwrap_err();
    let second = app.start(&token).await.unwrap_err();

    assert!(Arc::ptr_eq(
        first.service_error().unwrap(),
        second.service_error().unwrap()
    ));
    assert_eq!(journal.count("start:db"), 1);
}

#[tokio::test]
async fn shared_dependency_stops_after_its_slowest_dependent() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();

    let j = journal.clone();
    app.provide("root", move |s| {
        let (j_left, j_store, j_right) = (j.clone(), j.clone(), j.clone());
        s.provide("left", move |s| {
            s.provide("store", move |_| Ok(Probe::new("store", j_store)))?;
            Ok(Probe::new("left", j_left))
        })?;
        s.provide("right", move |s| {
            let _: Arc<Probe> = s.provide("store", |_| Err("constructed twice".into()))?;
            Ok(Probe::new("right", j_right).slow_stop(Duration::from_millis(50)))
        })?;
        Ok(Probe::new("root", j))
    })
    .unwrap();

    let token = CancellationToken::new();
    app.start(&token).await.unwrap();
    assert_eq!(journal.position("start:store"), 0);
    assert_eq!(journal.position("start:root"), 3);
    assert_eq!(journal.count("start:store"), 1);

    app.stop(&token).await.unwrap();
    let store = journal.position("stop:store");
    assert!(journal.position("stop:root") < journal.position("stop:left"));
    assert!(journal.position("stop:left") < store);
    assert!(journal.position("stop:right") < store);
}

#[tokio::test]
async fn stop_blocks_until_running_dependents_stopped() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, None).unwrap();

    let token = CancellationToken::new();
    app.start(&token).await.unwrap();

    let graph = Arc::clone(app.graph());
    let db = graph.lookup("db").unwrap();
    let early = tokio::spawn(Arc::clone(&graph).stop(db, token.clone()));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!early.is_finished());
    assert_eq!(app.status("db"), Some(Status::Running));

    app.stop(&token).await.unwrap();
    early.await.unwrap().unwrap();
    assert_eq!(
        journal.entries()[3..],
        ["stop:api", "stop:cache", "stop:db"]
    );
}

#[tokio::test]
async fn failing_stop_still_stops_dependencies() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();

    let j = journal.clone();
    app.provide("api", move |s| {
        let for_cache = j.clone();
        s.provide("cache", move |s| {
            let for_db = for_cache.clone();
            s.provide("db", move |_| Ok(Probe::new("db", for_db)))?;
            Ok(Probe::new("cache", for_cache).fail_stop_with("flush failed"))
        })?;
        Ok(Probe::new("api", j))
    })
    .unwrap();

    let token = CancellationToken::new();
    app.start(&token).await.unwrap();
    let err = app.stop(&token).await.unwrap_err();

    assert!(journal.position("stop:cache") < journal.position("stop:db"));
    assert_eq!(app.status("cache"), Some(Status::Error));
    assert_eq!(app.status("db"), Some(Status::Stopped));
    assert_eq!(
        err.to_string(),
        "service \"api\"\n>service \"cache\": flush failed"
    );
}

struct Panics {
    starts: Arc<AtomicUsize>,
}

#[async_trait]
impl Runnable for Panics {
    async fn start(&self, _ctx: Context) -> Result<(), BoxError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        panic!("pool exhausted");
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Component for Panics {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_shared_dependency_starts_once() {
    for _ in 0..20 {
        let mut app = App::new(Config::default());
        let starts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&starts);
        app.provide("root", move |s| {
            for id in ["x", "y", "z"] {
                let counter = Arc::clone(&counter);
                s.provide(id, move |s| {
                    s.provide("pool", move |_| Ok(Panics { starts: counter }))?;
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();

        let err = app.start(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(app.status("pool"), Some(Status::Error));
        let tree = err.service_error().unwrap();
        let causes = tree.root_causes();
        assert!(!causes.is_empty());
        assert!(causes.iter().all(|id| id == "pool"));

        let graph = app.graph();
        let pool = graph.lookup("pool").unwrap();
        assert_eq!(
            graph.nodes[pool].error().unwrap().to_string(),
            r#"service "pool": start panicked: pool exhausted"#
        );
    }
}

#[tokio::test]
async fn readiness_follows_the_status() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();

    let j = journal.clone();
    app.provide("api", move |s| {
        let (j_db, j_opt) = (j.clone(), j.clone());
        s.provide_with(
            "db",
            ServiceOptions::new().with_health(HealthConfig {
                name: Some("database".into()),
                ..HealthConfig::default()
            }),
            move |_| Ok(Probe::new("db", j_db)),
        )?;
        s.provide_with(
            "optional",
            ServiceOptions::new().with_health(HealthConfig {
                skip_on_err: true,
                ..HealthConfig::default()
            }),
            move |_| Ok(Probe::new("optional", j_opt).unhealthy()),
        )?;
        Ok(Probe::new("api", j))
    })
    .unwrap();

    let token = CancellationToken::new();
    let report = app.ready(&token).await;
    assert!(!report.is_ok());
    assert_eq!(
        report.get("database").unwrap().error.as_deref(),
        Some("service not started")
    );

    app.start(&token).await.unwrap();
    let report = app.ready(&token).await;
    assert!(report.is_ok());
    let names: Vec<_> = report.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["api", "database", "optional"]);
    assert_eq!(
        report.get("optional").unwrap().error.as_deref(),
        Some("not healthy")
    );

    app.stop(&token).await.unwrap();
    let report = app.ready(&token).await;
    assert_eq!(
        report.get("database").unwrap().error.as_deref(),
        Some("service stopped")
    );
    assert!(app.live());
}

#[tokio::test]
async fn readiness_reports_the_error_state() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, Some("refused")).unwrap();

    let token = CancellationToken::new();
    let _ = app.start(&token).await;

    let report = app.ready(&token).await;
    let db = report.get("db").unwrap();
    assert_eq!(
        db.error.as_deref(),
        Some("service in error state: service \"db\": refused")
    );
    assert!(!report.is_ok());
}

#[tokio::test]
async fn run_until_does_not_wait_when_start_fails() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, Some("refused")).unwrap();

    let polled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&polled);
    let res = app
        .run_until(&CancellationToken::new(), async move {
            flag.store(true, Ordering::SeqCst);
        })
        .await;

    assert!(matches!(res, Err(AppError::Service(_))));
    assert!(!polled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn run_until_stops_after_shutdown() {
    let mut app = App::new(Config::default());
    let journal = Journal::default();
    provide_chain(&mut app, &journal, None).unwrap();
    let mut events = app.subscribe();

    app.run_until(&CancellationToken::new(), async {})
        .await
        .unwrap();

    assert_eq!(app.status("db"), Some(Status::Stopped));
    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    let at = |kind| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(at(EventKind::AppStarted) < at(EventKind::ShutdownRequested));
    assert!(at(EventKind::ShutdownRequested) < at(EventKind::AppStopped));
}

struct WaitsForCancel;

#[async_trait]
impl Runnable for WaitsForCancel {
    async fn start(&self, ctx: Context) -> Result<(), BoxError> {
        ctx.cancelled().await;
        Err("start cancelled".into())
    }

    async fn stop(&self, _ctx: Context) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Component for WaitsForCancel {
    fn runnable(self: Arc<Self>) -> Option<Arc<dyn Runnable>> {
        Some(self)
    }
}

#[tokio::test]
async fn run_cancels_a_start_past_its_deadline() {
    let cfg = Config {
        start_timeout: Duration::from_millis(20),
        ..Config::default()
    };
    let mut app = App::new(cfg);
    app.provide("slow", |_| Ok(WaitsForCancel)).unwrap();

    let err = app
        .run_until(&CancellationToken::new(), async {})
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), r#"service "slow": start cancelled"#);
}

#[tokio::test]
async fn constructor_failure_is_the_root_error() {
    let mut app = App::new(Config::default());
    let res = app.provide::<String, _>("settings", |_| Err("missing DATABASE_URL".into()));

    assert!(matches!(res, Err(ProvideError::Unavailable { .. })));
    assert_eq!(
        app.error().unwrap().to_string(),
        r#"service "settings": missing DATABASE_URL"#
    );

    let err = app.start(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.to_string(), r#"service "settings": missing DATABASE_URL"#);
}

#[tokio::test]
async fn dependency_failure_is_inherited_at_registration() {
    let mut app = App::new(Config::default());
    app.provide::<String, _>("settings", |_| Err("missing".into()))
        .unwrap_err();

    app.provide("api", |s| {
        let _settings: Arc<String> = s.provide("settings", |_| Err("constructed twice".into()))?;
        Ok(())
    })
    .unwrap_err();

    assert_eq!(
        app.error().unwrap().to_string(),
        "service \"api\"\n>service \"settings\": missing"
    );
    assert_eq!(app.status("api"), Some(Status::Error));
}

#[tokio::test]
async fn reserved_ids_are_rejected() {
    let mut app = App::new(Config::default());
    let res = app.provide("system.main", |_| Ok(()));
    assert!(matches!(res, Err(ProvideError::Reserved { .. })));
    assert!(app.service_ids().is_empty());

    app.provide("api", |s| {
        s.provide("system.healthz", |_| Ok(()))?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(
        app.error().unwrap().to_string(),
        r#"service "api": invalid service id: "system.healthz" (system.* is reserved for internal use)"#
    );
}

#[tokio::test]
async fn type_mismatch_is_rejected() {
    let mut app = App::new(Config::default());
    app.provide("value", |_| Ok("text".to_string())).unwrap();

    let res = app.provide("value", |_| Ok(TagSet::new()));
    assert!(matches!(res, Err(ProvideError::TypeMismatch { .. })));
}

#[tokio::test]
async fn lifecycle_requires_a_service() {
    let app = App::new(Config::default());
    let token = CancellationToken::new();

    assert!(matches!(app.start(&token).await, Err(AppError::NothingConstructed)));
    assert!(matches!(app.stop(&token).await, Err(AppError::NothingConstructed)));
    assert!(app.error().is_none());
}

#[tokio::test]
async fn provide_after_start_is_sealed() {
    let mut app = App::new(Config::default());
    app.provide("value", |_| Ok(())).unwrap();
    app.start(&CancellationToken::new()).await.unwrap();

    let res = app.provide("late", |_| Ok(()));
    assert!(matches!(res, Err(ProvideError::Sealed { .. })));
}

struct Gauges;

impl Collector for Gauges {
    fn collect(&self) {}
}

impl Component for Gauges {
    fn collector(self: Arc<Self>) -> Option<Arc<dyn Collector>> {
        Some(self)
    }
}

#[tokio::test]
async fn collectors_are_registered_on_start() {
    let mut app = App::new(Config::default());
    app.provide("gauges", |_| Ok(Gauges)).unwrap();
    assert!(app.metrics().is_empty());

    app.start(&CancellationToken::new()).await.unwrap();
    assert_eq!(app.metrics().ids(), vec!["gauges".to_string()]);
}

#[derive(Default)]
struct Instrumented {
    tags: Tagged,
    namespace: Mutex<Option<(String, String)>>,
}

impl Taggable for Instrumented {
    fn with_tags(&self, tags: &TagSet) {
        self.tags.with_tags(tags);
    }
}

impl Metricable for Instrumented {
    fn set_metrics(&self, system: &str, subsystem: &str, _tags: &TagSet) {
        *self.namespace.lock().unwrap() = Some((system.to_string(), subsystem.to_string()));
    }
}

impl Component for Instrumented {
    fn taggable(self: Arc<Self>) -> Option<Arc<dyn Taggable>> {
        Some(self)
    }

    fn metricable(self: Arc<Self>) -> Option<Arc<dyn Metricable>> {
        Some(self)
    }
}

#[tokio::test]
async fn construction_hands_out_tags_and_metrics_namespace() {
    let mut app = App::builder(Config::default()).with_name("my-app").build();
    let value = app
        .provide_with(
            "db",
            ServiceOptions::new()
                .with_component_name("primary-db")
                .with_tags([Tag::new("region", "eu")]),
            |_| Ok(Instrumented::default()),
        )
        .unwrap();

    assert_eq!(
        value.tags.tags([]).to_string(),
        "component=primary-db,region=eu"
    );
    assert_eq!(
        *value.namespace.lock().unwrap(),
        Some(("my_app".to_string(), "primary_db".to_string()))
    );
}

#[tokio::test]
async fn default_component_tag_is_the_id() {
    let mut app = App::new(Config::default());
    let value = app.provide("cache", |_| Ok(Instrumented::default())).unwrap();

    assert_eq!(value.tags.tags([]).get("component"), Some("cache"));
}

#[cfg(feature = "http")]
mod http {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::http::{Api, Healthz, Middleware, MiddlewareChain};

    use super::*;

    async fn get_status(router: &Router, path: &str) -> StatusCode {
        router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    struct Routes;

    impl Api for Routes {
        fn register_handler(&self, router: Router) -> Router {
            router.route("/hello", get(|| async { "hello" }))
        }
    }

    impl Middleware for Routes {
        fn register_middleware(&self, chain: MiddlewareChain) -> MiddlewareChain {
            chain.append(|router: Router| router.route("/version", get(|| async { "1.0.0" })))
        }
    }

    impl Healthz for Routes {
        fn register_healthz_handler(&self, router: Router) -> Router {
            router.route("/extra", get(|| async { "extra" }))
        }
    }

    impl Component for Routes {
        fn api(self: Arc<Self>) -> Option<Arc<dyn Api>> {
            Some(self)
        }

        fn middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
            Some(self)
        }

        fn healthz(self: Arc<Self>) -> Option<Arc<dyn Healthz>> {
            Some(self)
        }
    }

    #[tokio::test]
    async fn construction_wires_routes_and_middleware() {
        let mut app = App::new(Config::default());
        app.provide("routes", |_| Ok(Routes)).unwrap();

        let main = app.main_router();
        assert_eq!(get_status(&main, "/hello").await, StatusCode::OK);
        assert_eq!(get_status(&main, "/version").await, StatusCode::OK);

        let healthz = app.healthz_router();
        assert_eq!(get_status(&healthz, "/extra").await, StatusCode::OK);
        assert_eq!(get_status(&healthz, "/live").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_route_follows_the_graph() {
        let mut app = App::new(Config::default());
        let journal = Journal::default();
        provide_chain(&mut app, &journal, None).unwrap();

        let healthz = app.healthz_router();
        assert_eq!(get_status(&healthz, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);

        let res = app.provide("late", |_| Ok(()));
        assert!(matches!(res, Err(ProvideError::Sealed { .. })));

        let token = CancellationToken::new();
        app.start(&token).await.unwrap();
        assert_eq!(get_status(&healthz, "/ready").await, StatusCode::OK);

        app.stop(&token).await.unwrap();
        assert_eq!(get_status(&healthz, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    struct Connections;

    impl Collector for Connections {
        fn collect(&self) {
            ::metrics::gauge!("db_open_connections").set(7.0);
        }
    }

    impl Component for Connections {
        fn collector(self: Arc<Self>) -> Option<Arc<dyn Collector>> {
            Some(self)
        }
    }

    async fn scrape(router: &Router) -> String {
        let res = router
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_route_serves_started_collectors() {
        let mut app = App::new(Config::default());
        app.provide("connections", |_| Ok(Connections)).unwrap();

        let healthz = app.healthz_router();
        assert!(!scrape(&healthz).await.contains("db_open_connections"));

        app.start(&CancellationToken::new()).await.unwrap();
        assert!(scrape(&healthz).await.contains("db_open_connections 7"));
    }
}
