// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! - [`ConfigError`]: problems detected while loading or validating the task
//!   configuration. Always fatal, always reported before any task runs.
//! - [`StepError`]: an external transformation inside a pipeline rejected.
//! - [`ServerError`]: the dev server could not start (or was started twice).
//! - [`WatchError`]: a watch pattern could not be subscribed.
//! - [`RunError`]: what a single `TaskRunner::run` invocation returns.

use std::net::SocketAddr;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate task: '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("unknown task: '{0}'")]
    UnknownTask(TaskName),

    #[error("task '{task}' has unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite {
        task: TaskName,
        prerequisite: TaskName,
    },

    #[error("cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<TaskName>),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A pipeline step rejected its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step '{step}' failed: {message}")]
pub struct StepError {
    pub step: String,
    pub message: String,
}

impl StepError {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to start dev server on {addr}: {source}")]
    Start {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("dev server already running on {0}")]
    Duplicate(SocketAddr),
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("cannot watch pattern '{pattern}': {message}")]
    Subscription { pattern: String, message: String },
}

/// Error returned by a single task action.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// Server start failures abort the whole run, not just the task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::Server(_))
    }
}

/// Cloneable record of a failed task, carried through the runtime channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task '{task}' failed{}: {message}", .step.as_ref().map(|s| format!(" in step '{s}'")).unwrap_or_default())]
pub struct TaskFailure {
    pub task: TaskName,
    /// Offending pipeline step, if the failure came from one.
    pub step: Option<String>,
    pub message: String,
    /// Whether the failure must abort the process (e.g. dev server bind).
    pub fatal: bool,
}

impl TaskFailure {
    pub fn from_action_error(task: impl Into<TaskName>, err: &ActionError) -> Self {
        let (step, message) = match err {
            ActionError::Step(e) => (Some(e.step.clone()), e.message.clone()),
            other => (None, format!("{other:#}")),
        };
        Self {
            task: task.into(),
            step,
            message,
            fatal: err.is_fatal(),
        }
    }
}

/// Result of a failed `TaskRunner::run` invocation.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    TaskFailed(#[from] TaskFailure),

    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_lists_path() {
        let err = ConfigError::CyclicDependency(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(err.to_string(), "cyclic dependency: A -> B -> A");
    }

    #[test]
    fn task_failure_names_step() {
        let err = ActionError::Step(StepError::new("sass", "expected \";\""));
        let failure = TaskFailure::from_action_error("sass", &err);
        assert_eq!(failure.step.as_deref(), Some("sass"));
        assert!(!failure.fatal);
        assert_eq!(
            failure.to_string(),
            "task 'sass' failed in step 'sass': expected \";\""
        );
    }
}
