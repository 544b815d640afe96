// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces:
//! - an updated run state
//! - a list of commands describing what the IO shell should do next
//!
//! It has no channels, no Tokio types and performs no IO, so it can be
//! stepped by hand in tests.

use crate::dag::{ExecutionPlan, Scheduler, TaskRunState};
use crate::engine::event_handlers::{
    advance_stages, handle_task_completion, handle_task_started, CoreStep, RunProgress,
};
use crate::engine::RuntimeEvent;

/// Pure core runtime state for one run.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    plan: ExecutionPlan,
    progress: RunProgress,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, plan: ExecutionPlan) -> Self {
        let mut progress = RunProgress::default();
        progress.summary.run_id = scheduler.run_id();
        Self {
            scheduler,
            plan,
            progress,
        }
    }

    /// Begin the first stage. An empty plan finishes immediately.
    pub fn start(&mut self) -> CoreStep {
        advance_stages(&mut self.scheduler, &self.plan, &mut self.progress)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.progress.finished {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            RuntimeEvent::TaskStarted { task } => {
                handle_task_started(&mut self.progress, task);
                CoreStep {
                    commands: Vec::new(),
                    keep_running: true,
                }
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                let mut commands =
                    handle_task_completion(&mut self.scheduler, &mut self.progress, task, outcome);
                let mut step = advance_stages(&mut self.scheduler, &self.plan, &mut self.progress);
                commands.append(&mut step.commands);
                CoreStep {
                    commands,
                    keep_running: step.keep_running,
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress.finished
    }

    /// Number of stages begun so far.
    pub fn stages_begun(&self) -> usize {
        self.progress.next_stage
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.scheduler.run_state_of(task)
    }
}
