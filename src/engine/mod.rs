// src/engine/mod.rs

//! Orchestration engine.
//!
//! One [`TaskRunner::run`](runner::TaskRunner::run) call builds an
//! [`ExecutionPlan`](crate::dag::ExecutionPlan), then drives it with:
//! - the pure core state machine in [`core`] (stage barrier, failure policy)
//! - the async IO shell in [`runtime`] (event channel, executor dispatch)
//!
//! [`state`] tracks the process-wide lifecycle (`Idle` .. `Watching`).

use crate::errors::TaskFailure;
use crate::types::TaskName;

/// Outcome of a task action for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Events flowing from the executor into a run's runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The executor began the task's action.
    TaskStarted { task: TaskName },
    /// The task's action finished.
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: u64,
    /// Tasks in the order their actions started.
    pub started: Vec<TaskName>,
    /// Tasks in the order they completed successfully.
    pub completed: Vec<TaskName>,
    /// Tasks never started because a prerequisite failed.
    pub skipped: Vec<TaskName>,
    /// A `serve` task succeeded during this run.
    pub started_server: bool,
}

pub mod core;
pub mod event_handlers;
pub mod runner;
pub mod runtime;
pub mod state;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runner::TaskRunner;
pub use runtime::Runtime;
pub use state::{ProcessState, ProcessTracker};
