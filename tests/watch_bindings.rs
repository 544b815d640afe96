// tests/watch_bindings.rs

use std::path::{Path, PathBuf};

use assetflow::config::presets;
use assetflow::errors::WatchError;
use assetflow::types::Preset;
use assetflow::watch::{compile_bindings, process_file_change};
use tokio::sync::mpsc;

async fn triggered(paths: &[&str]) -> Vec<Vec<String>> {
    let cfg = presets::load(Preset::Full).unwrap();
    let bindings = compile_bindings(cfg.watch_bindings()).unwrap();
    let (tx, mut rx) = mpsc::channel(16);

    let paths: Vec<PathBuf> = paths.iter().map(|p| Path::new("/site").join(p)).collect();
    process_file_change(Path::new("/site"), &paths, &bindings, &tx).await;
    drop(tx);

    let mut out = Vec::new();
    while let Some(t) = rx.recv().await {
        out.push(t.tasks);
    }
    out
}

#[tokio::test]
async fn scss_change_triggers_only_sass() {
    assert_eq!(triggered(&["src/scss/main.scss"]).await, vec![vec!["sass".to_string()]]);
}

#[tokio::test]
async fn html_change_triggers_only_watch_html() {
    assert_eq!(triggered(&["src/index.html"]).await, vec![vec!["watch-html".to_string()]]);
}

#[tokio::test]
async fn script_change_triggers_only_watch_js() {
    assert_eq!(triggered(&["src/js/lib/app.js"]).await, vec![vec!["watch-js".to_string()]]);
}

#[tokio::test]
async fn output_and_nested_html_trigger_nothing() {
    assert!(triggered(&["dist/index.html", "src/partials/nav.html"]).await.is_empty());
}

#[test]
fn bad_pattern_fails_subscription() {
    let err = compile_bindings(&[assetflow::config::WatchConfig {
        pattern: "src/{a,b".into(),
        tasks: vec!["html".into()],
    }])
    .unwrap_err();
    assert!(matches!(err, WatchError::Subscription { .. }));
}
