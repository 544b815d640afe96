// tests/task_graph.rs

mod common;

use std::time::Duration;

use assetflow::config::presets;
use assetflow::dag::{TaskDef, TaskRegistry, Target};
use assetflow::errors::{ConfigError, RunError};
use assetflow::types::Preset;
use assetflow_test_utils::builders::{one, par};
use assetflow_test_utils::{init_tracing, with_timeout, ConfigFileBuilder, FakeExecutor, TaskConfigBuilder};

use common::fake_runner;

#[tokio::test]
async fn shared_prerequisite_runs_exactly_once_and_first() {
    init_tracing();
    // diamond: build -> {css, js} -> clean
    let cfg = ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::clean("dist").build())
        .with_task("css", TaskConfigBuilder::group().after("clean").build())
        .with_task("js", TaskConfigBuilder::group().after("clean").build())
        .with_task("build", TaskConfigBuilder::group().after("css").after("js").build())
        .build();

    let fake = FakeExecutor::new();
    let runner = fake_runner(&cfg, &fake);
    let summary = with_timeout(runner.run(&Target::task("build"))).await.unwrap();

    let started = fake.started();
    assert_eq!(started.iter().filter(|t| *t == "clean").count(), 1);
    assert_eq!(started.len(), 4);
    assert!(fake.ended_before_start("clean", "css"));
    assert!(fake.ended_before_start("clean", "js"));
    assert!(fake.ended_before_start("css", "build"));
    assert!(fake.ended_before_start("js", "build"));
    assert_eq!(summary.completed.last().map(String::as_str), Some("build"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = TaskRegistry::new();
    registry.register(TaskDef::group("html", Vec::<&str>::new())).unwrap();
    let err = registry
        .register(TaskDef::group("html", Vec::<&str>::new()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateTask(name) if name == "html"));
}

#[tokio::test]
async fn unknown_task_fails_before_anything_runs() {
    let cfg = ConfigFileBuilder::new()
        .with_task("html", TaskConfigBuilder::group().build())
        .build();
    let fake = FakeExecutor::new();
    let runner = fake_runner(&cfg, &fake);

    let err = runner.run(&Target::task("nope")).await.unwrap_err();
    assert!(matches!(err, RunError::Config(ConfigError::UnknownTask(name)) if name == "nope"));
    assert!(fake.timeline().is_empty());
}

#[test]
fn cycle_is_rejected_at_validation() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::group().after("b").build())
        .with_task("b", TaskConfigBuilder::group().after("a").build())
        .try_build()
        .unwrap_err();

    match err {
        ConfigError::CyclicDependency(path) => {
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"a".to_string()));
            assert!(path.contains(&"b".to_string()));
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn unknown_prerequisite_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("sass", TaskConfigBuilder::group().after("missing").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnknownPrerequisite { task, prerequisite } if task == "sass" && prerequisite == "missing"
    ));
}

#[tokio::test]
async fn default_sequence_runs_in_stages() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_task("reset", TaskConfigBuilder::clean("dist").build())
        .with_task("html", TaskConfigBuilder::group().build())
        .with_task("sass", TaskConfigBuilder::group().build())
        .with_task("js", TaskConfigBuilder::group().build())
        .with_task("server", TaskConfigBuilder::serve().build())
        .with_task(
            "default",
            TaskConfigBuilder::sequence(vec![
                one("reset"),
                one("html"),
                par(&["sass", "js"]),
                one("server"),
            ])
            .build(),
        )
        .build();

    let fake = FakeExecutor::new()
        .delay("sass", Duration::from_millis(30))
        .delay("js", Duration::from_millis(10));
    let runner = fake_runner(&cfg, &fake);
    with_timeout(runner.run(&Target::task("default"))).await.unwrap();

    assert!(fake.ended_before_start("reset", "html"));
    assert!(fake.ended_before_start("html", "sass"));
    assert!(fake.ended_before_start("html", "js"));
    // sass and js overlap: both start before either ends.
    let start_js = fake.position("start:js").unwrap();
    let end_sass = fake.position("end:sass").unwrap();
    assert!(start_js < end_sass);
    assert!(fake.ended_before_start("sass", "server"));
    assert!(fake.ended_before_start("js", "server"));
}

#[tokio::test]
async fn failure_skips_dependents_but_siblings_finish() {
    let cfg = ConfigFileBuilder::new()
        .with_task("sass", TaskConfigBuilder::group().build())
        .with_task("js", TaskConfigBuilder::group().build())
        .with_task("bundle", TaskConfigBuilder::group().after("js").build())
        .with_task("server", TaskConfigBuilder::serve().build())
        .with_task(
            "default",
            TaskConfigBuilder::sequence(vec![par(&["sass", "bundle"]), one("server")]).build(),
        )
        .build();

    let fake = FakeExecutor::new()
        .failing("js")
        .delay("sass", Duration::from_millis(30));
    let runner = fake_runner(&cfg, &fake);
    let err = with_timeout(runner.run(&Target::task("default"))).await.unwrap_err();

    match err {
        RunError::TaskFailed(failure) => assert_eq!(failure.task, "js"),
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    let started = fake.started();
    assert!(started.contains(&"sass".to_string()));
    assert!(fake.position("end:sass").is_some());
    assert!(!started.contains(&"bundle".to_string()));
    assert!(!started.contains(&"server".to_string()));
}

#[tokio::test]
async fn full_preset_default_orders_like_the_build() {
    let cfg = presets::load(Preset::Full).unwrap();
    let fake = FakeExecutor::new();
    let runner = fake_runner(&cfg, &fake);

    with_timeout(runner.run(&Target::task("default"))).await.unwrap();

    let started = fake.started();
    assert_eq!(started.first().map(String::as_str), Some("reset"));
    assert_eq!(started.last().map(String::as_str), Some("server"));
    assert!(fake.ended_before_start("reset", "html"));
    assert!(fake.ended_before_start("html", "sass"));
    assert!(fake.ended_before_start("html", "js"));
}
