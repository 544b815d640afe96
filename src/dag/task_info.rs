// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::dag::registry::{TaskAction, TaskDef};
use crate::types::{ReloadKind, TaskName};

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of this run, waiting on prerequisites.
    Pending,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    DoneFailed,
    /// Never started because a prerequisite failed.
    Skipped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::DoneSuccess | RunState::DoneFailed | RunState::Skipped
        )
    }
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Skipped) => TaskRunState::Skipped,
        }
    }
}

/// Static task information taken from the registry, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct prerequisites (`after = [...]`).
    pub deps: Vec<TaskName>,
    pub action: Option<TaskAction>,
    pub reload: Option<ReloadKind>,

    /// `None` if not participating in the run.
    pub run_state: Option<RunState>,
}

impl TaskInfo {
    pub fn from_def(def: &TaskDef) -> Self {
        Self {
            name: def.name.clone(),
            deps: def.prerequisites.clone(),
            action: def.action.clone(),
            reload: def.reload,
            run_state: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub action: Option<TaskAction>,
    /// Reload signal to send after the action succeeds.
    pub reload: Option<ReloadKind>,
    /// All tasks dispatched by one `TaskRunner::run` share the same `run_id`.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            action: info.action.clone(),
            reload: info.reload,
            run_id,
        }
    }

    /// Bare task with no action, e.g. for executor tests.
    pub fn noop(name: impl Into<TaskName>, run_id: u64) -> Self {
        Self {
            name: name.into(),
            action: None,
            reload: None,
            run_id,
        }
    }
}
