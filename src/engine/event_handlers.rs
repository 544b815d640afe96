// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::dag::registry::TaskAction;
use crate::dag::{ExecutionPlan, ScheduledTask, Scheduler};
use crate::engine::{RunSummary, TaskOutcome};
use crate::errors::TaskFailure;
use crate::types::TaskName;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The run is over: full success, or the first failure encountered.
    Finish(Result<RunSummary, TaskFailure>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Mutable bookkeeping of a run, owned by the core.
#[derive(Debug, Default)]
pub struct RunProgress {
    /// Index of the next stage to begin.
    pub next_stage: usize,
    pub first_failure: Option<TaskFailure>,
    pub summary: RunSummary,
    pub finished: bool,
}

pub fn handle_task_started(progress: &mut RunProgress, task: TaskName) {
    debug!(task = %task, run_id = progress.summary.run_id, "task action started");
    progress.summary.started.push(task);
}

/// Record a completion and dispatch whatever it unblocked.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    progress: &mut RunProgress,
    task: TaskName,
    outcome: TaskOutcome,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    match &outcome {
        TaskOutcome::Success => {
            if matches!(scheduler.action_of(&task), Some(TaskAction::Serve)) {
                progress.summary.started_server = true;
            }
            progress.summary.completed.push(task.clone());
        }
        TaskOutcome::Failed(failure) => {
            match &progress.first_failure {
                None => progress.first_failure = Some(failure.clone()),
                // A fatal failure outranks an earlier ordinary one.
                Some(first) if failure.fatal && !first.fatal => {
                    progress.first_failure = Some(failure.clone());
                }
                Some(_) => debug!(task = %task, "additional failure in a failed run; discarded"),
            }
        }
    }

    let step = scheduler.handle_completion(&task, &outcome);
    progress.summary.skipped.extend(step.newly_skipped);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    commands
}

/// Move the plan forward once the current stage is done.
///
/// - While tasks are pending or running, nothing happens.
/// - After a failure no new stage begins; the run finishes with that
///   failure once nothing is running anymore.
/// - Stages whose tasks all ran earlier in the run are passed through.
pub fn advance_stages(
    scheduler: &mut Scheduler,
    plan: &ExecutionPlan,
    progress: &mut RunProgress,
) -> CoreStep {
    let mut commands = Vec::new();

    loop {
        if progress.finished {
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        if scheduler.has_active() {
            return CoreStep {
                commands,
                keep_running: true,
            };
        }

        if let Some(failure) = progress.first_failure.clone() {
            info!(run_id = scheduler.run_id(), task = %failure.task, "run stopped after failure");
            progress.finished = true;
            commands.push(CoreCommand::Finish(Err(failure)));
            continue;
        }

        let Some(stage) = plan.stages().get(progress.next_stage) else {
            progress.finished = true;
            commands.push(CoreCommand::Finish(Ok(progress.summary.clone())));
            continue;
        };

        debug!(
            run_id = scheduler.run_id(),
            stage = progress.next_stage,
            roots = ?stage.roots,
            "beginning stage"
        );
        progress.next_stage += 1;

        let step = scheduler.begin_stage(&stage.roots);
        if !step.newly_scheduled.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
        }
    }
}
