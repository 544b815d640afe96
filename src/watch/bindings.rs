// src/watch/bindings.rs

use std::fmt;

use globset::GlobMatcher;

use crate::config::WatchConfig;
use crate::errors::WatchError;
use crate::pipeline::sources::compile_glob;
use crate::types::TaskName;

/// A watch pattern and the tasks it triggers.
#[derive(Clone)]
pub struct CompiledBinding {
    id: usize,
    pattern: String,
    tasks: Vec<TaskName>,
    matcher: GlobMatcher,
}

impl fmt::Debug for CompiledBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledBinding")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl CompiledBinding {
    pub fn new(id: usize, pattern: &str, tasks: Vec<TaskName>) -> Result<Self, WatchError> {
        if pattern.trim().is_empty() {
            return Err(WatchError::Subscription {
                pattern: pattern.to_string(),
                message: "empty pattern".into(),
            });
        }
        let matcher = compile_glob(pattern)
            .map_err(|e| WatchError::Subscription {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();
        Ok(Self {
            id,
            pattern: pattern.to_string(),
            tasks,
            matcher,
        })
    }

    /// Position in the config's `[[watch]]` list.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// `rel_path` is project-relative with `/` separators.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

pub fn compile_bindings(configs: &[WatchConfig]) -> Result<Vec<CompiledBinding>, WatchError> {
    configs
        .iter()
        .enumerate()
        .map(|(id, w)| CompiledBinding::new(id, &w.pattern, w.tasks.clone()))
        .collect()
}
