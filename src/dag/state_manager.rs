// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::registry::TaskRegistry;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::types::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    registry: &'a TaskRegistry,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        registry: &'a TaskRegistry,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_id: u64,
    ) -> Self {
        Self {
            registry,
            tasks,
            run_id,
        }
    }

    /// Include a stage root and all its upstream prerequisites in this run.
    ///
    /// Tasks not yet part of the run are marked `Pending`; tasks that already
    /// ran earlier in this run keep their state, so they are not repeated.
    pub fn mark_task_and_prerequisites_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            match self.tasks.get_mut(&name) {
                Some(info) => {
                    if info.run_state.is_none() {
                        info.run_state = Some(RunState::Pending);
                        debug!(task = %info.name, run_id = self.run_id, "marked Pending");
                    }
                    stack.extend(info.deps.iter().cloned());
                }
                None => {
                    warn!(task = %name, "task not schedulable (unknown or sequence task); ignoring");
                }
            }
        }
    }

    /// Whether every prerequisite of `info` succeeded in this run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark pending dependents (transitively) of a failed task as `Skipped`.
    ///
    /// Returns the newly skipped tasks, excluding the failed task itself.
    pub fn mark_dependents_skipped(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<String> = self
            .registry
            .dependents_of(failed_task)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut newly_skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Skipped);
                    debug!(
                        task = %info.name,
                        run_id = self.run_id,
                        upstream = %failed_task,
                        "skipping dependent of failed task"
                    );
                    newly_skipped.push(info.name.clone());
                    stack.extend(
                        self.registry
                            .dependents_of(&name)
                            .into_iter()
                            .map(str::to_string),
                    );
                }
            }
        }

        newly_skipped
    }

    /// Mark every pending task of the run `Skipped`, sorted by name.
    pub fn skip_all_pending(&mut self, cause: &str) -> Vec<TaskName> {
        let mut skipped: Vec<TaskName> = self
            .tasks
            .values_mut()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .map(|info| {
                info.run_state = Some(RunState::Skipped);
                info.name.clone()
            })
            .collect();
        skipped.sort();
        if !skipped.is_empty() {
            debug!(run_id = self.run_id, upstream = %cause, ?skipped, "fatal failure; skipping the rest of the run");
        }
        skipped
    }

    /// Collect tasks that are `Pending` with all prerequisites done, mark
    /// them `Running` and return them, sorted by name.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(task = %info.name, run_id = self.run_id, "starting task");
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(info, self.run_id));
            }
        }

        ready
    }

    /// No task is pending or running.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view used when only shared access to the tasks map exists.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state == Some(RunState::DoneSuccess),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
