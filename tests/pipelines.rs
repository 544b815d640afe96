// tests/pipelines.rs
//
// Pipelines against a real temporary project directory.

use std::fs;
use std::path::Path;

use assetflow::dag::Target;
use assetflow::errors::RunError;
use assetflow::orchestrator::Orchestrator;
use assetflow::pipeline::StepConfig;
use assetflow::types::OutputStyle;
use assetflow_test_utils::{init_tracing, with_timeout, ConfigFileBuilder, TaskConfigBuilder};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn sorted_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn sass_task() -> assetflow::config::TaskConfig {
    TaskConfigBuilder::pipeline("src/scss/**/*.scss")
        .dest("dist/css")
        .step(StepConfig::Sass {
            output_style: OutputStyle::Compressed,
        })
        .build()
}

fn js_task() -> assetflow::config::TaskConfig {
    TaskConfigBuilder::pipeline("src/js/lib/**/*.js")
        .dest("dist/js")
        .step(StepConfig::Concat {
            file: "scripts.js".into(),
            separator: "\n".into(),
        })
        .step(StepConfig::Write { dir: None })
        .step(StepConfig::Rename {
            to: Some("scripts.min.js".into()),
            suffix: None,
            extname: None,
        })
        .build()
}

#[tokio::test]
async fn each_stylesheet_compiles_to_its_own_css() {
    init_tracing();
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/scss/_vars.scss", "$accent: #c00;");
    write(root, "src/scss/main.scss", "@import 'vars';\nh1 { color: $accent; }");
    write(root, "src/scss/print.scss", "body { margin: 0; }");
    write(root, "src/scss/theme.scss", ".a { .b { padding: 1px; } }");

    let cfg = ConfigFileBuilder::new().with_task("sass", sass_task()).build();
    let mut orch = Orchestrator::new(root, cfg).unwrap();
    with_timeout(orch.run_target(&Target::task("sass"))).await.unwrap();

    assert_eq!(
        sorted_files(&root.join("dist/css")),
        vec!["main.css", "print.css", "theme.css"]
    );
    let main = fs::read_to_string(root.join("dist/css/main.css")).unwrap();
    assert!(main.contains("#c00"));
    let theme = fs::read_to_string(root.join("dist/css/theme.css")).unwrap();
    assert!(theme.contains(".a .b"));
}

#[tokio::test]
async fn concat_writes_bundle_and_renamed_copy() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/js/lib/a.js", "var a = 1;");
    write(root, "src/js/lib/b.js", "var b = 2;");
    write(root, "src/js/lib/vendor/c.js", "var c = 3;");

    let cfg = ConfigFileBuilder::new().with_task("js", js_task()).build();
    let mut orch = Orchestrator::new(root, cfg).unwrap();
    with_timeout(orch.run_target(&Target::task("js"))).await.unwrap();

    assert_eq!(
        sorted_files(&root.join("dist/js")),
        vec!["scripts.js", "scripts.min.js"]
    );
    let bundle = fs::read_to_string(root.join("dist/js/scripts.js")).unwrap();
    assert_eq!(bundle, "var a = 1;\nvar b = 2;\nvar c = 3;");
}

#[tokio::test]
async fn empty_source_set_succeeds_without_output() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "README.md", "nothing to build");

    let cfg = ConfigFileBuilder::new().with_task("js", js_task()).build();
    let mut orch = Orchestrator::new(root, cfg).unwrap();
    let summary = with_timeout(orch.run_target(&Target::task("js"))).await.unwrap();

    assert_eq!(summary.completed, vec!["js".to_string()]);
    assert!(!root.join("dist").exists());
}

#[tokio::test]
async fn sass_error_fails_the_task_with_step_identity() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/scss/broken.scss", "a { color: ");

    let cfg = ConfigFileBuilder::new().with_task("sass", sass_task()).build();
    let mut orch = Orchestrator::new(root, cfg).unwrap();
    let err = with_timeout(orch.run_target(&Target::task("sass"))).await.unwrap_err();

    match err {
        RunError::TaskFailed(failure) => {
            assert_eq!(failure.task, "sass");
            assert_eq!(failure.step.as_deref(), Some("sass"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn clean_then_copy_in_sequence() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "dist/stale.html", "old");
    write(root, "src/index.html", "<p>new</p>");

    let cfg = ConfigFileBuilder::new()
        .with_task("reset", TaskConfigBuilder::clean("dist").build())
        .with_task(
            "html",
            TaskConfigBuilder::pipeline("src/*.html").dest("dist").build(),
        )
        .build();
    let mut orch = Orchestrator::new(root, cfg).unwrap();
    with_timeout(orch.run_target(&Target::sequence(["reset", "html"])))
        .await
        .unwrap();

    assert_eq!(sorted_files(&root.join("dist")), vec!["index.html"]);
}
