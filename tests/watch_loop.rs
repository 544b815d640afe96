// tests/watch_loop.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assetflow::config::ConfigFile;
use assetflow::dag::Target;
use assetflow::engine::ProcessState;
use assetflow::errors::{AssetflowError, RunError};
use assetflow::orchestrator::Orchestrator;
use assetflow::server::{DevServer, ServerOptions};
use assetflow::watch::{compile_bindings, process_file_change, WatchTrigger};
use assetflow_test_utils::{init_tracing, with_timeout, ConfigFileBuilder, FakeExecutor, TaskConfigBuilder};
use tokio::sync::{mpsc, oneshot};

fn site() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("html", TaskConfigBuilder::group().build())
        .with_task("sass", TaskConfigBuilder::group().build())
        .with_task("js", TaskConfigBuilder::group().build())
        .with_task("server", TaskConfigBuilder::serve().build())
        .with_task("watch-html", TaskConfigBuilder::group().after("html").build())
        .with_watch("src/*.html", &["watch-html"])
        .with_watch("src/scss/**/*.scss", &["sass"])
        .with_watch("src/js/**/*.js", &["js"])
        .build()
}

/// Orchestrator past its initial run, ready to watch.
async fn watching(root: &Path, fake: &FakeExecutor) -> Orchestrator {
    let server = Arc::new(DevServer::new(ServerOptions::default()));
    let mut orch = Orchestrator::with_executor(root, site(), server, Arc::new(fake.clone())).unwrap();
    orch.run_target(&Target::task("html")).await.unwrap();
    assert_eq!(orch.state(), ProcessState::Succeeded);
    orch
}

fn trigger(tasks: &[&str]) -> WatchTrigger {
    WatchTrigger {
        binding: 0,
        pattern: "test".into(),
        tasks: tasks.iter().map(|t| t.to_string()).collect(),
        path: "src/changed".into(),
    }
}

fn shutdown_signal() -> (oneshot::Sender<()>, impl std::future::Future<Output = ()>) {
    let (tx, rx) = oneshot::channel::<()>();
    (tx, async move {
        let _ = rx.await;
    })
}

#[tokio::test]
async fn failed_rebuild_keeps_watching() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeExecutor::new().failing("js");
    let mut orch = watching(dir.path(), &fake).await;

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (stop, shutdown) = shutdown_signal();

    let driver = async {
        trigger_tx.send(trigger(&["js"])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger_tx.send(trigger(&["sass"])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = stop.send(());
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(orch.watch_triggers(trigger_rx, shutdown), driver)
    })
    .await;

    assert!(result.is_ok(), "a failing rebuild must not end watching: {result:?}");
    assert_eq!(orch.state(), ProcessState::Watching);
    assert_eq!(fake.start_count("js"), 1);
    assert_eq!(fake.start_count("sass"), 1, "later triggers still run");
}

#[tokio::test]
async fn trigger_during_run_queues_one_follow_up() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeExecutor::new().delay("sass", Duration::from_millis(300));
    let mut orch = watching(dir.path(), &fake).await;

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (stop, shutdown) = shutdown_signal();

    let driver = async {
        for _ in 0..3 {
            trigger_tx.send(trigger(&["sass"])).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let _ = stop.send(());
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(orch.watch_triggers(trigger_rx, shutdown), driver)
    })
    .await;

    result.unwrap();
    assert_eq!(fake.start_count("sass"), 2);
    assert!(
        fake.timeline().iter().filter(|e| *e == "end:sass").count() == 2,
        "the follow-up starts only after the first run ended: {:?}",
        fake.timeline()
    );
    assert_eq!(orch.state(), ProcessState::Watching);
}

#[tokio::test]
async fn file_change_runs_only_bound_tasks() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeExecutor::new();
    let mut orch = watching(dir.path(), &fake).await;
    let before = fake.started();

    let bindings = compile_bindings(site().watch_bindings()).unwrap();
    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (stop, shutdown) = shutdown_signal();
    let root = dir.path().to_path_buf();

    let driver = async {
        let sent = process_file_change(
            &root,
            &[root.join("src/scss/main.scss")],
            &bindings,
            &trigger_tx,
        )
        .await;
        assert_eq!(sent, 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = stop.send(());
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(orch.watch_triggers(trigger_rx, shutdown), driver)
    })
    .await;

    result.unwrap();
    let after = fake.started();
    assert_eq!(&after[before.len()..], ["sass".to_string()]);
}

#[tokio::test]
async fn fatal_rebuild_ends_watching_with_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeExecutor::new().fatal("server");
    let mut orch = watching(dir.path(), &fake).await;

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (_stop, shutdown) = shutdown_signal();
    trigger_tx.send(trigger(&["server"])).await.unwrap();

    let result = with_timeout(orch.watch_triggers(trigger_rx, shutdown)).await;

    match result {
        Err(AssetflowError::Run(RunError::TaskFailed(failure))) => {
            assert_eq!(failure.task, "server");
            assert!(failure.fatal);
        }
        other => panic!("expected a fatal task failure, got {other:?}"),
    }
    assert_eq!(orch.state(), ProcessState::Failed);
}
