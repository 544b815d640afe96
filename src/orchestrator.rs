// src/orchestrator.rs

//! Ties a validated config to the runner, the dev server and the watcher.

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{ConfigFile, ServerSection};
use crate::dag::{TaskRegistry, Target};
use crate::engine::{ProcessState, ProcessTracker, RunSummary, TaskRunner};
use crate::errors::{ConfigError, Result, RunError, TaskFailure};
use crate::exec::{ActionContext, ActionExecutor, ExecutorBackend};
use crate::fs::RealFileSystem;
use crate::server::{DevServer, ServerOptions};
use crate::types::TaskName;
use crate::watch::{compile_bindings, spawn_watcher, WatchTrigger};

const TRIGGER_CHANNEL_CAPACITY: usize = 64;

type RunResult = (Vec<TaskName>, std::result::Result<RunSummary, RunError>);

pub fn server_addr(server: &ServerSection) -> std::result::Result<SocketAddr, ConfigError> {
    let ip: IpAddr = server
        .host
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("server.host '{}': {e}", server.host)))?;
    Ok(SocketAddr::new(ip, server.port))
}

#[derive(Debug)]
pub struct Orchestrator {
    root: PathBuf,
    config: ConfigFile,
    server: Arc<DevServer>,
    runner: TaskRunner,
    tracker: ProcessTracker,
}

impl Orchestrator {
    /// Production wiring: real filesystem, real actions.
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile) -> Result<Self> {
        let root = root.into();
        let server = Arc::new(DevServer::new(ServerOptions {
            inject_changes: config.server().inject_changes,
        }));
        let executor = ActionExecutor::new(ActionContext {
            root: root.clone(),
            fs: Arc::new(RealFileSystem),
            server: server.clone(),
            serve_root: PathBuf::from(&config.server().root),
            serve_addr: server_addr(config.server())?,
        });
        Self::with_executor(root, config, server, Arc::new(executor))
    }

    pub fn with_executor(
        root: impl Into<PathBuf>,
        config: ConfigFile,
        server: Arc<DevServer>,
        executor: Arc<dyn ExecutorBackend>,
    ) -> Result<Self> {
        let mut tracker = ProcessTracker::new();
        tracker.transition(ProcessState::Validating);

        let registry = match TaskRegistry::from_tasks(config.tasks()) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                tracker.transition(ProcessState::Failed);
                return Err(e.into());
            }
        };
        let runner = TaskRunner::new(registry, executor)?;

        Ok(Self {
            root: root.into(),
            config,
            server,
            runner,
            tracker,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub fn server(&self) -> &Arc<DevServer> {
        &self.server
    }

    pub fn state(&self) -> ProcessState {
        self.tracker.state()
    }

    /// The initial run.
    pub async fn run_target(&mut self, target: &Target) -> std::result::Result<RunSummary, RunError> {
        self.tracker.transition(ProcessState::Running);
        let result = self.runner.run(target).await;
        self.tracker.transition(if result.is_ok() {
            ProcessState::Succeeded
        } else {
            ProcessState::Failed
        });
        result
    }

    /// Rebuild on file changes until `shutdown` resolves, then stop the dev
    /// server.
    pub async fn watch<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let bindings = compile_bindings(self.config.watch_bindings())?;
        if bindings.is_empty() {
            info!("no watch bindings configured; serving only");
        }

        let (trigger_tx, trigger_rx) = mpsc::channel::<WatchTrigger>(TRIGGER_CHANNEL_CAPACITY);
        let _watcher = spawn_watcher(&self.root, bindings, trigger_tx)?;
        self.watch_triggers(trigger_rx, shutdown).await
    }

    /// The watch loop over an arbitrary trigger source.
    ///
    /// A failed rebuild is logged and watching continues. A fatal failure
    /// (the dev server could not start) ends the loop with that error. A
    /// trigger for a task set that is still running queues exactly one
    /// follow-up run.
    pub async fn watch_triggers<F>(
        &mut self,
        mut trigger_rx: mpsc::Receiver<WatchTrigger>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.tracker.transition(ProcessState::Watching);

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RunResult>();
        let mut in_flight: HashSet<Vec<TaskName>> = HashSet::new();
        let mut rerun: HashSet<Vec<TaskName>> = HashSet::new();
        let mut fatal: Option<TaskFailure> = None;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                Some(trigger) = trigger_rx.recv() => {
                    info!(path = %trigger.path, tasks = ?trigger.tasks, "change detected");
                    if in_flight.contains(&trigger.tasks) {
                        rerun.insert(trigger.tasks);
                        continue;
                    }
                    self.spawn_watch_run(trigger.tasks, &done_tx, &mut in_flight);
                }
                Some((tasks, result)) = done_rx.recv() => {
                    in_flight.remove(&tasks);
                    self.tracker.watch_run_finished();
                    match result {
                        Ok(summary) => info!(tasks = ?tasks, completed = summary.completed.len(), "rebuild finished"),
                        Err(RunError::TaskFailed(failure)) if failure.fatal => {
                            error!(tasks = ?tasks, "rebuild failed fatally: {failure}");
                            fatal = Some(failure);
                            break;
                        }
                        Err(e) => error!(tasks = ?tasks, "rebuild failed: {e}"),
                    }
                    if rerun.remove(&tasks) {
                        self.spawn_watch_run(tasks, &done_tx, &mut in_flight);
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            warn!(runs = in_flight.len(), "stopping with rebuilds still in flight");
        }
        self.server.shutdown().await;

        match fatal {
            Some(failure) => {
                self.tracker.transition(ProcessState::Failed);
                Err(RunError::TaskFailed(failure).into())
            }
            None => Ok(()),
        }
    }

    fn spawn_watch_run(
        &mut self,
        tasks: Vec<TaskName>,
        done_tx: &mpsc::UnboundedSender<RunResult>,
        in_flight: &mut HashSet<Vec<TaskName>>,
    ) {
        in_flight.insert(tasks.clone());
        self.tracker.watch_run_started();

        let runner = self.runner.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = runner.run(&Target::sequence(tasks.iter().cloned())).await;
            let _ = done_tx.send((tasks, result));
        });
    }

    pub async fn shutdown(&self) {
        self.server.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_str;

    fn config(toml: &str) -> ConfigFile {
        ConfigFile::try_from(parse_str(toml).unwrap()).unwrap()
    }

    #[test]
    fn server_addr_from_section() {
        let cfg = config(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [task.server]
            serve = true
            "#,
        );
        assert_eq!(
            server_addr(cfg.server()).unwrap(),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
    }

    #[tokio::test]
    async fn initial_run_moves_through_states() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.html"), "<p>hi</p>").unwrap();

        let cfg = config(
            r#"
            [task.html]
            src = ["src/*.html"]
            dest = "dist"
            "#,
        );
        let mut orch = Orchestrator::new(dir.path(), cfg).unwrap();
        assert_eq!(orch.state(), ProcessState::Validating);

        let summary = orch.run_target(&Target::task("html")).await.unwrap();
        assert_eq!(summary.completed, vec!["html".to_string()]);
        assert_eq!(orch.state(), ProcessState::Succeeded);
        assert!(dir.path().join("dist/index.html").is_file());
    }
}
