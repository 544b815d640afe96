// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::pipeline::steps::StepConfig;
use crate::types::{ReloadKind, TaskName};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// default_task = "default"
///
/// [server]
/// root = "dist"
/// port = 1234
///
/// [task.sass]
/// src = ["src/scss/**/*.scss"]
/// dest = "dist/css"
/// reload = "css"
/// steps = [{ kind = "sass", output_style = "nested" }]
///
/// [task.default]
/// sequence = ["html", ["sass", "js"], "server"]
///
/// [[watch]]
/// pattern = "src/scss/**/*.scss"
/// tasks = ["sass"]
/// ```
///
/// All sections except `[task.*]` are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,

    /// `[[watch]]` bindings, in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    task: BTreeMap<TaskName, TaskConfig>,
    watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            server: raw.server,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn tasks(&self) -> &BTreeMap<TaskName, TaskConfig> {
        &self.task
    }

    pub fn watch_bindings(&self) -> &[WatchConfig] {
        &self.watch
    }

    /// Task run when no task is named on the command line.
    pub fn default_task(&self) -> &str {
        self.config.default_task.as_deref().unwrap_or(DEFAULT_TASK)
    }
}

pub const DEFAULT_TASK: &str = "default";

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Overrides the `default` task name. Must name a configured task.
    #[serde(default)]
    pub default_task: Option<TaskName>,
}

/// `[server]` section: the dev server started by `serve = true` tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Directory served, relative to the project root.
    #[serde(default = "default_server_root")]
    pub root: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When true, `reload = "css"` swaps stylesheets without a page refresh.
    #[serde(default = "default_true")]
    pub inject_changes: bool,
}

fn default_server_root() -> String {
    "dist".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1234
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            root: default_server_root(),
            host: default_host(),
            port: default_port(),
            inject_changes: default_true(),
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one action kind may be set: a pipeline (`src` + `steps` +
/// optional `dest`), `clean`, `serve`, or a `sequence` directive. A task
/// with none of them is a pure grouping task.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Prerequisites: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<TaskName>,

    /// Source globs, relative to the project root.
    #[serde(default)]
    pub src: Option<Vec<String>>,

    /// Globs removed from the source set.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Output directory, relative to the project root.
    #[serde(default)]
    pub dest: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Directory to delete.
    #[serde(default)]
    pub clean: Option<String>,

    /// Start the dev server.
    #[serde(default)]
    pub serve: bool,

    /// Composite directive: each element runs to completion before the next.
    #[serde(default)]
    pub sequence: Option<Vec<SequenceItem>>,

    /// Live-reload signal sent after the task succeeds.
    #[serde(default)]
    pub reload: Option<ReloadKind>,
}

impl TaskConfig {
    pub fn is_pipeline(&self) -> bool {
        self.src.is_some()
    }

    pub fn is_composite(&self) -> bool {
        self.sequence.is_some()
    }

    /// Short label for the task kind, used in dry-run output and errors.
    pub fn kind_label(&self) -> &'static str {
        if self.is_composite() {
            "sequence"
        } else if self.is_pipeline() {
            "pipeline"
        } else if self.clean.is_some() {
            "clean"
        } else if self.serve {
            "serve"
        } else {
            "group"
        }
    }
}

/// One element of a `sequence`: a task name or a parallel set of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SequenceItem {
    Task(TaskName),
    Parallel(Vec<TaskName>),
}

impl SequenceItem {
    pub fn names(&self) -> Vec<&str> {
        match self {
            SequenceItem::Task(name) => vec![name.as_str()],
            SequenceItem::Parallel(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `[[watch]]` binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    pub pattern: String,
    pub tasks: Vec<TaskName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sequence_with_parallel_set() {
        let raw: RawConfigFile = toml::from_str(
            r#"
            [task.default]
            sequence = ["reset", ["sass", "js"], "server"]
            "#,
        )
        .unwrap();

        let seq = raw.task["default"].sequence.clone().unwrap();
        assert_eq!(
            seq,
            vec![
                SequenceItem::Task("reset".into()),
                SequenceItem::Parallel(vec!["sass".into(), "js".into()]),
                SequenceItem::Task("server".into()),
            ]
        );
    }

    #[test]
    fn server_section_defaults() {
        let raw: RawConfigFile = toml::from_str("[task.a]\n").unwrap();
        assert_eq!(raw.server.root, "dist");
        assert_eq!(raw.server.port, 1234);
        assert!(raw.server.inject_changes);
        assert!(raw.config.default_task.is_none());
        assert_eq!(raw.task["a"].kind_label(), "group");
    }

    #[test]
    fn unknown_task_field_is_rejected() {
        let res: Result<RawConfigFile, _> = toml::from_str("[task.a]\ncmd = \"echo\"\n");
        assert!(res.is_err());
    }
}
