use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use assetflow::dag::ScheduledTask;
use assetflow::engine::{RuntimeEvent, TaskOutcome};
use assetflow::errors::{Result, TaskFailure};
use assetflow::exec::ExecutorBackend;

/// A fake executor that:
/// - records a timeline of `start:<task>` / `end:<task>` entries
/// - fails the tasks it was told to fail, optionally fatally
/// - optionally holds a task "running" for a fixed delay
#[derive(Clone, Default)]
pub struct FakeExecutor {
    timeline: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
    /// Failures that must abort the process (like a server bind error).
    fatal: Arc<HashSet<String>>,
    delays: Arc<HashMap<String, Duration>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, task: &str) -> Self {
        Arc::make_mut(&mut self.failing).insert(task.to_string());
        self
    }

    pub fn fatal(mut self, task: &str) -> Self {
        Arc::make_mut(&mut self.fatal).insert(task.to_string());
        self
    }

    /// How many times `task`'s action started.
    pub fn start_count(&self, task: &str) -> usize {
        self.started().iter().filter(|t| *t == task).count()
    }

    pub fn delay(mut self, task: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(task.to_string(), delay);
        self
    }

    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().unwrap().clone()
    }

    /// Task names in the order their actions started.
    pub fn started(&self) -> Vec<String> {
        self.timeline()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.timeline().iter().position(|e| e == entry)
    }

    /// `a` finished before `b` started.
    pub fn ended_before_start(&self, a: &str, b: &str) -> bool {
        match (
            self.position(&format!("end:{a}")),
            self.position(&format!("start:{b}")),
        ) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in tasks {
                let timeline = Arc::clone(&self.timeline);
                let fatal = self.fatal.contains(&t.name);
                let fail = fatal || self.failing.contains(&t.name);
                let delay = self.delays.get(&t.name).copied();
                let events = events.clone();

                tokio::spawn(async move {
                    timeline.lock().unwrap().push(format!("start:{}", t.name));
                    let _ = events
                        .send(RuntimeEvent::TaskStarted {
                            task: t.name.clone(),
                        })
                        .await;

                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }

                    timeline.lock().unwrap().push(format!("end:{}", t.name));
                    let outcome = if fail {
                        TaskOutcome::Failed(TaskFailure {
                            task: t.name.clone(),
                            step: None,
                            message: "injected failure".to_string(),
                            fatal,
                        })
                    } else {
                        TaskOutcome::Success
                    };
                    let _ = events
                        .send(RuntimeEvent::TaskCompleted {
                            task: t.name,
                            outcome,
                        })
                        .await;
                });
            }
            Ok(())
        })
    }
}
