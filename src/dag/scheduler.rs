// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::registry::{TaskAction, TaskRegistry};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::TaskOutcome;
use crate::types::TaskName;

/// Per-run scheduler over the immutable task registry.
///
/// It is responsible for:
/// - remembering which tasks are part of the run
/// - deciding when a task is ready (all prerequisites succeeded)
/// - marking tasks as succeeded/failed
/// - skipping pending dependents when a task fails
///
/// One scheduler serves exactly one `TaskRunner::run` call.
#[derive(Debug)]
pub struct Scheduler {
    registry: Arc<TaskRegistry>,
    tasks: HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl Scheduler {
    pub fn new(registry: Arc<TaskRegistry>, run_id: u64) -> Self {
        let tasks = registry
            .tasks()
            .filter(|def| !def.is_composite())
            .map(|def| (def.name.clone(), TaskInfo::from_def(def)))
            .collect();

        Self {
            registry,
            tasks,
            run_id,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    pub fn action_of(&self, task: &str) -> Option<&TaskAction> {
        self.tasks.get(task)?.action.as_ref()
    }

    /// Names of tasks participating in this run, sorted.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        let mut names: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the prerequisites of `task` succeeded in this run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Some task is pending or running.
    pub fn has_active(&self) -> bool {
        self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }

    pub fn has_running(&self) -> bool {
        self.tasks
            .values()
            .any(|info| info.run_state == Some(RunState::Running))
    }

    /// Start a stage: include `roots` and their prerequisites, dispatch
    /// whatever is ready.
    pub fn begin_stage(&mut self, roots: &[TaskName]) -> SchedulerStep {
        debug!(run_id = self.run_id, ?roots, "scheduler: beginning stage");
        let mut manager = StateManager::new(&self.registry, &mut self.tasks, self.run_id);
        for root in roots.iter() {
            manager.mark_task_and_prerequisites_pending(root);
        }
        let newly_scheduled = manager.collect_new_ready_tasks();
        let stage_finished = manager.all_tasks_terminal();

        SchedulerStep {
            newly_scheduled,
            newly_skipped: Vec::new(),
            stage_finished,
        }
    }

    /// Record a finished task and work out what runs next.
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %info.name, run_id = self.run_id, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.registry, &mut self.tasks, self.run_id);
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
                TaskOutcome::Failed(failure) => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(
                        task = %info.name,
                        run_id = self.run_id,
                        error = %failure,
                        "task failed; skipping its dependents in this run"
                    );
                    let mut manager =
                        StateManager::new(&self.registry, &mut self.tasks, self.run_id);
                    if failure.fatal {
                        // Running tasks finish; nothing new is dispatched.
                        step.newly_skipped = manager.skip_all_pending(task);
                    } else {
                        step.newly_skipped = manager.mark_dependents_skipped(task);
                        // Independent pending tasks of the stage still get to run.
                        step.newly_scheduled = manager.collect_new_ready_tasks();
                    }
                }
            },
            Some(info) => {
                warn!(
                    task = %task,
                    state = ?info.run_state,
                    "completion for a task that is not running; ignoring"
                );
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.stage_finished = !self.has_active();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::registry::TaskDef;
    use crate::errors::TaskFailure;

    fn scheduler(defs: Vec<TaskDef>) -> Scheduler {
        let mut reg = TaskRegistry::new();
        for def in defs {
            reg.register(def).unwrap();
        }
        reg.validate().unwrap();
        Scheduler::new(Arc::new(reg), 1)
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    fn failed(task: &str) -> TaskOutcome {
        TaskOutcome::Failed(TaskFailure {
            task: task.to_string(),
            step: None,
            message: "boom".into(),
            fatal: false,
        })
    }

    fn fatal(task: &str) -> TaskOutcome {
        TaskOutcome::Failed(TaskFailure {
            task: task.to_string(),
            step: None,
            message: "address in use".into(),
            fatal: true,
        })
    }

    #[test]
    fn prerequisites_dispatch_first() {
        let mut s = scheduler(vec![
            TaskDef::group("html", Vec::<String>::new()),
            TaskDef::group("watch-html", ["html"]),
        ]);

        let step = s.begin_stage(&["watch-html".to_string()]);
        assert_eq!(names(&step.newly_scheduled), vec!["html"]);
        assert_eq!(s.run_state_of("watch-html"), Some(TaskRunState::Pending));

        let step = s.handle_completion("html", &TaskOutcome::Success);
        assert_eq!(names(&step.newly_scheduled), vec!["watch-html"]);
        assert!(!step.stage_finished);

        let step = s.handle_completion("watch-html", &TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.stage_finished);
    }

    #[test]
    fn failure_skips_dependents_but_not_siblings() {
        let mut s = scheduler(vec![
            TaskDef::group("a", Vec::<String>::new()),
            TaskDef::group("b", Vec::<String>::new()),
            TaskDef::group("after-a", ["a"]),
            TaskDef::group("after-after-a", ["after-a"]),
        ]);

        let step = s.begin_stage(&["after-after-a".to_string(), "b".to_string()]);
        assert_eq!(names(&step.newly_scheduled), vec!["a", "b"]);

        let step = s.handle_completion("a", &failed("a"));
        let mut skipped = step.newly_skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec!["after-a", "after-after-a"]);
        assert!(!step.stage_finished, "b is still running");

        let step = s.handle_completion("b", &TaskOutcome::Success);
        assert!(step.stage_finished);
        assert_eq!(s.run_state_of("after-a"), Some(TaskRunState::Skipped));
        assert_eq!(s.run_state_of("b"), Some(TaskRunState::DoneSuccess));
    }

    #[test]
    fn fatal_failure_stops_dispatching_independent_tasks() {
        let mut s = scheduler(vec![
            TaskDef::group("server", Vec::<String>::new()),
            TaskDef::group("html", Vec::<String>::new()),
            TaskDef::group("img", ["html"]),
            TaskDef::group("js", ["html"]),
        ]);

        let step = s.begin_stage(&["server".to_string(), "img".to_string(), "js".to_string()]);
        assert_eq!(names(&step.newly_scheduled), vec!["html", "server"]);

        let step = s.handle_completion("server", &fatal("server"));
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(step.newly_skipped, vec!["img", "js"]);
        assert!(!step.stage_finished, "html is still running");

        let step = s.handle_completion("html", &TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty(), "img and js were skipped");
        assert!(step.stage_finished);
        assert_eq!(s.run_state_of("js"), Some(TaskRunState::Skipped));
    }

    #[test]
    fn done_task_is_not_rescheduled_by_later_stage() {
        let mut s = scheduler(vec![
            TaskDef::group("html", Vec::<String>::new()),
            TaskDef::group("watch-html", ["html"]),
        ]);
        s.begin_stage(&["html".to_string()]);
        s.handle_completion("html", &TaskOutcome::Success);

        let step = s.begin_stage(&["watch-html".to_string()]);
        assert_eq!(names(&step.newly_scheduled), vec!["watch-html"]);
    }

    #[test]
    fn duplicate_completion_is_ignored() {
        let mut s = scheduler(vec![TaskDef::group("a", Vec::<String>::new())]);
        s.begin_stage(&["a".to_string()]);
        s.handle_completion("a", &TaskOutcome::Success);
        let step = s.handle_completion("a", &failed("a"));
        assert!(step.newly_skipped.is_empty());
        assert_eq!(s.run_state_of("a"), Some(TaskRunState::DoneSuccess));
    }
}
