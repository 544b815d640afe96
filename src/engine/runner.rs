// src/engine/runner.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::{ExecutionPlan, Scheduler, TaskRegistry, Target};
use crate::engine::core::CoreRuntime;
use crate::engine::runtime::Runtime;
use crate::engine::{RunSummary, RuntimeEvent};
use crate::errors::{ConfigError, RunError};
use crate::exec::ExecutorBackend;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runs targets against a validated registry.
///
/// Cheap to clone; every `run` call gets its own run id, scheduler and event
/// channel, so watch-triggered runs may overlap.
#[derive(Clone)]
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
    executor: Arc<dyn ExecutorBackend>,
    run_counter: Arc<AtomicU64>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("tasks", &self.registry.len())
            .field("runs", &self.run_counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        executor: Arc<dyn ExecutorBackend>,
    ) -> Result<Self, ConfigError> {
        if !registry.is_validated() {
            return Err(ConfigError::Invalid(
                "task registry must be validated before running tasks".to_string(),
            ));
        }
        Ok(Self {
            registry,
            executor,
            run_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn plan(&self, target: &Target) -> Result<ExecutionPlan, ConfigError> {
        ExecutionPlan::build(&self.registry, target)
    }

    /// Run `target` to completion.
    ///
    /// Resolves with the summary on full success, or with the first failure.
    /// Unknown task names fail before anything runs.
    pub async fn run(&self, target: &Target) -> Result<RunSummary, RunError> {
        let plan = self.plan(target)?;
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!(run_id, target = %target, "run started");

        let result = self.run_plan(plan, run_id).await;
        match &result {
            Ok(summary) => info!(
                run_id,
                target = %target,
                completed = summary.completed.len(),
                "run succeeded"
            ),
            Err(err) => error!(run_id, target = %target, error = %err, "run failed"),
        }
        result
    }

    async fn run_plan(&self, plan: ExecutionPlan, run_id: u64) -> Result<RunSummary, RunError> {
        let scheduler = Scheduler::new(self.registry.clone(), run_id);
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
        let core = CoreRuntime::new(scheduler, plan);
        Runtime::new(core, rx, tx, self.executor.clone()).run().await
    }
}
