#![allow(dead_code)]

use assetflow::config::{ConfigFile, RawConfigFile, SequenceItem, TaskConfig, WatchConfig};
use assetflow::errors::ConfigError;
use assetflow::pipeline::StepConfig;
use assetflow::types::ReloadKind;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, pattern: &str, tasks: &[&str]) -> Self {
        self.config.watch.push(WatchConfig {
            pattern: pattern.to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn with_default_task(mut self, name: &str) -> Self {
        self.config.config.default_task = Some(name.to_string());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile, ConfigError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task with no action; only useful for its prerequisites.
    pub fn group() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn pipeline(src: &str) -> Self {
        Self::group().src(src)
    }

    pub fn clean(dir: &str) -> Self {
        let mut b = Self::group();
        b.task.clean = Some(dir.to_string());
        b
    }

    pub fn serve() -> Self {
        let mut b = Self::group();
        b.task.serve = true;
        b
    }

    pub fn sequence(items: Vec<SequenceItem>) -> Self {
        let mut b = Self::group();
        b.task.sequence = Some(items);
        b
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task
            .src
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dir: &str) -> Self {
        self.task.dest = Some(dir.to_string());
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn reload(mut self, kind: ReloadKind) -> Self {
        self.task.reload = Some(kind);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// `SequenceItem::Task` shorthand.
pub fn one(name: &str) -> SequenceItem {
    SequenceItem::Task(name.to_string())
}

/// `SequenceItem::Parallel` shorthand.
pub fn par(names: &[&str]) -> SequenceItem {
    SequenceItem::Parallel(names.iter().map(|n| n.to_string()).collect())
}
