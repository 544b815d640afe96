// src/dag/mod.rs

//! Task graph, execution plans and per-run scheduling.
//!
//! - [`registry`] holds task definitions and the prerequisite graph.
//! - [`plan`] expands a [`Target`] into ordered stages.
//! - [`scheduler`] is the per-run state machine that decides which tasks
//!   are ready and skips dependents of failed tasks.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod plan;
pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use plan::{ExecutionPlan, Stage, Target};
pub use registry::{EdgeKind, TaskAction, TaskDef, TaskRegistry};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
