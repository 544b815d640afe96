// src/exec/action.rs

//! Production executor: runs each scheduled task's action in its own tokio
//! task and reports back to the run's runtime.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::registry::TaskAction;
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{ActionError, Result, TaskFailure};
use crate::fs::FileSystem;
use crate::pipeline::{self, StepContext};
use crate::server::DevServer;

use super::backend::ExecutorBackend;

/// Everything a task action may touch.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Project root; task paths are relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub server: Arc<DevServer>,
    /// Directory served by `serve` tasks, relative to `root`.
    pub serve_root: PathBuf,
    pub serve_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct ActionExecutor {
    ctx: Arc<ActionContext>,
}

impl ActionExecutor {
    pub fn new(ctx: ActionContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &ActionContext {
        &self.ctx
    }
}

impl ExecutorBackend for ActionExecutor {
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let ctx = self.ctx.clone();

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_scheduled(task, ctx.clone(), events.clone()));
            }
            Ok(())
        })
    }
}

async fn run_scheduled(
    task: ScheduledTask,
    ctx: Arc<ActionContext>,
    events: mpsc::Sender<RuntimeEvent>,
) {
    let _ = events
        .send(RuntimeEvent::TaskStarted {
            task: task.name.clone(),
        })
        .await;

    let started = Instant::now();
    // A panicking action must still report a completion.
    let action = {
        let task = task.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { run_action(&task, &ctx).await })
    };

    let outcome = match action.await {
        Err(join_err) => {
            let failure = TaskFailure {
                task: task.name.clone(),
                step: None,
                message: format!("task panicked: {join_err}"),
                fatal: false,
            };
            error!(task = %task.name, run_id = task.run_id, error = %failure.message, "task failed");
            TaskOutcome::Failed(failure)
        }
        Ok(Ok(())) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            if let Some(kind) = task.reload {
                ctx.server.reload(kind);
            }
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            let failure = TaskFailure::from_action_error(task.name.clone(), &err);
            error!(
                task = %task.name,
                run_id = task.run_id,
                step = failure.step.as_deref().unwrap_or("-"),
                error = %failure.message,
                "task failed"
            );
            TaskOutcome::Failed(failure)
        }
    };

    if events
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task.name, "run finished before task completion was delivered");
    }
}

/// Run one task's action to completion.
pub async fn run_action(
    task: &ScheduledTask,
    ctx: &ActionContext,
) -> std::result::Result<(), ActionError> {
    match &task.action {
        None => {
            debug!(task = %task.name, "grouping task; nothing to do");
            Ok(())
        }
        Some(TaskAction::Pipeline(p)) => {
            let step_ctx = StepContext::new(
                ctx.root.clone(),
                ctx.fs.clone(),
                p.dest().map(|d| ctx.root.join(d)),
            );
            let report = pipeline::run(&step_ctx, p, &task.name).await?;
            debug!(
                task = %task.name,
                read = report.read,
                written = report.written.len(),
                unchanged = report.unchanged,
                "pipeline report"
            );
            Ok(())
        }
        Some(TaskAction::Clean { path }) => {
            let target = ctx.root.join(path);
            let fs = ctx.fs.clone();
            info!(task = %task.name, path = %target.display(), "cleaning");
            tokio::task::spawn_blocking(move || fs.remove_dir_all(&target))
                .await
                .map_err(|e| ActionError::Other(e.into()))??;
            Ok(())
        }
        Some(TaskAction::Serve) => {
            let root = ctx.root.join(&ctx.serve_root);
            let addr = ctx.server.start(root, ctx.serve_addr).await?;
            debug!(task = %task.name, %addr, "serve task done");
            Ok(())
        }
    }
}
