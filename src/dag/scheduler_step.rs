// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::types::TaskName;

/// Structured result of a single scheduler "step".
///
/// Tests use it to step a run manually and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Pending dependents skipped because of a failure in this step.
    pub newly_skipped: Vec<TaskName>,
    /// Whether no task of the current stage is pending or running anymore.
    pub stage_finished: bool,
}
