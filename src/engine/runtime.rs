// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::errors::{RunError, TaskFailure};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RunSummary, RuntimeEvent};

/// Drives one run's core in response to `RuntimeEvent`s and delegates
/// task execution to an `ExecutorBackend`.
///
/// All run semantics live in `CoreRuntime`; this shell only reads events
/// and dispatches tasks.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Handed to the executor so tasks can report back.
    event_tx: mpsc::Sender<RuntimeEvent>,
    executor: Arc<dyn ExecutorBackend>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        executor: Arc<dyn ExecutorBackend>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            executor,
        }
    }

    /// Main event loop; resolves once the core finishes the run.
    pub async fn run(mut self) -> Result<RunSummary, RunError> {
        let step = self.core.start();
        if let Some(result) = self.execute(step).await? {
            return result.map_err(RunError::from);
        }

        loop {
            let Some(event) = self.event_rx.recv().await else {
                return Err(RunError::Runtime(
                    "runtime event channel closed before the run finished".to_string(),
                ));
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            if let Some(result) = self.execute(step).await? {
                return result.map_err(RunError::from);
            }
        }
    }

    /// Execute the commands of one core step; returns the run result once
    /// the core issued `Finish`.
    async fn execute(
        &mut self,
        step: CoreStep,
    ) -> Result<Option<Result<RunSummary, TaskFailure>>, RunError> {
        let mut finished = None;
        for command in step.commands {
            match command {
                CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
                CoreCommand::Finish(result) => finished = Some(result),
            }
        }
        Ok(finished)
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<(), RunError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor
            .spawn_ready_tasks(tasks, self.event_tx.clone())
            .await
            .map_err(|e| RunError::Runtime(format!("failed to dispatch tasks: {e}")))
    }
}
