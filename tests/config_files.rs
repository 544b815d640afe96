// tests/config_files.rs

use std::io::Write;
use std::path::Path;

use assetflow::config::loader::{project_root, resolve};
use assetflow::config::{load_and_validate, ConfigSource};
use assetflow::errors::ConfigError;
use assetflow::types::Preset;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn demo_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Assetflow.toml");
    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.default_task(), "default");
    assert_eq!(cfg.watch_bindings().len(), 3);
    assert_eq!(project_root(&path), path.parent().unwrap());
}

#[test]
fn cycle_in_file_is_a_structured_error() {
    let file = config_file(
        r#"
[task.A]
after = ["B"]

[task.B]
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ConfigError::CyclicDependency(path)) => assert_eq!(path.len(), 3),
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn unknown_step_kind_is_a_toml_error() {
    let file = config_file(
        r#"
[task.js]
src = ["src/**/*.js"]
steps = [{ kind = "uglify" }]
"#,
    );
    assert!(matches!(load_and_validate(file.path()), Err(ConfigError::Toml(_))));
}

#[test]
fn mixed_task_kinds_are_invalid() {
    let file = config_file(
        r#"
[task.odd]
clean = "dist"
serve = true
"#,
    );
    assert!(matches!(load_and_validate(file.path()), Err(ConfigError::Invalid(_))));
}

#[test]
fn explicit_preset_wins_over_file() {
    let file = config_file(
        r#"
[task.only]
"#,
    );
    let (cfg, source) = resolve(file.path(), Some(Preset::Lite)).unwrap();
    assert_eq!(source, ConfigSource::Preset(Preset::Lite));
    assert!(cfg.tasks().contains_key("html"));
    assert!(!cfg.tasks().contains_key("reset"));

    let (cfg, source) = resolve(file.path(), None).unwrap();
    assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
    assert_eq!(cfg.tasks().len(), 1);
}
