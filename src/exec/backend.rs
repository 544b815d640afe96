// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running actions
//! itself. Production uses [`ActionExecutor`](super::action::ActionExecutor);
//! tests swap in a fake that records what was scheduled and emits
//! `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send + Sync {
    /// Launch the given tasks. Must not wait for them to finish: each task
    /// reports `TaskStarted` and then exactly one `TaskCompleted` on
    /// `events` when done.
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
