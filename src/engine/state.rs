// src/engine/state.rs

use std::fmt;

use tracing::{info, warn};

/// Process lifecycle:
/// `Idle -> Validating -> Running -> {Succeeded | Failed}`, and
/// `Succeeded -> Watching <-> Running` once the dev server is up, and
/// `Watching -> Failed` when a rebuild fails fatally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Validating,
    Running,
    Succeeded,
    Failed,
    Watching,
}

impl ProcessState {
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Running)
                | (Validating, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Succeeded, Watching)
                | (Watching, Running)
                | (Running, Watching)
                | (Watching, Failed)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Idle => "idle",
            ProcessState::Validating => "validating",
            ProcessState::Running => "running",
            ProcessState::Succeeded => "succeeded",
            ProcessState::Failed => "failed",
            ProcessState::Watching => "watching",
        };
        f.write_str(s)
    }
}

/// Current process state plus the number of in-flight runs while watching.
#[derive(Debug)]
pub struct ProcessTracker {
    state: ProcessState,
    active_runs: usize,
}

impl Default for ProcessTracker {
    fn default() -> Self {
        Self {
            state: ProcessState::Idle,
            active_runs: 0,
        }
    }
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn active_runs(&self) -> usize {
        self.active_runs
    }

    /// Move to `next`, logging the transition. Illegal transitions are
    /// logged and ignored.
    pub fn transition(&mut self, next: ProcessState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "ignoring invalid process state transition");
            return false;
        }
        info!(from = %self.state, to = %next, "process state");
        self.state = next;
        true
    }

    /// A watch-triggered run began.
    pub fn watch_run_started(&mut self) {
        self.active_runs += 1;
        if self.state == ProcessState::Watching {
            self.transition(ProcessState::Running);
        }
    }

    /// A watch-triggered run ended (either way); back to `Watching` when no
    /// other run is in flight.
    pub fn watch_run_finished(&mut self) {
        self.active_runs = self.active_runs.saturating_sub(1);
        if self.active_runs == 0 && self.state == ProcessState::Running {
            self.transition(ProcessState::Watching);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_watching() {
        let mut t = ProcessTracker::new();
        assert!(t.transition(ProcessState::Validating));
        assert!(t.transition(ProcessState::Running));
        assert!(t.transition(ProcessState::Succeeded));
        assert!(t.transition(ProcessState::Watching));
        assert!(!t.transition(ProcessState::Idle));
        assert_eq!(t.state(), ProcessState::Watching);
    }

    #[test]
    fn overlapping_watch_runs_return_to_watching_once() {
        let mut t = ProcessTracker::new();
        t.transition(ProcessState::Validating);
        t.transition(ProcessState::Running);
        t.transition(ProcessState::Succeeded);
        t.transition(ProcessState::Watching);

        t.watch_run_started();
        t.watch_run_started();
        assert_eq!(t.state(), ProcessState::Running);
        t.watch_run_finished();
        assert_eq!(t.state(), ProcessState::Running);
        t.watch_run_finished();
        assert_eq!(t.state(), ProcessState::Watching);
        assert_eq!(t.active_runs(), 0);
    }
}
