// src/watch/event_handler.rs

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::fs::relative_slash_path;
use crate::types::TaskName;
use crate::watch::bindings::CompiledBinding;

/// A watched file changed; run `tasks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTrigger {
    pub binding: usize,
    pub pattern: String,
    pub tasks: Vec<TaskName>,
    /// First matching path of the event, project-relative.
    pub path: String,
}

/// Send one trigger per binding matched by any of `paths`. Returns the
/// number of triggers sent.
pub async fn process_file_change(
    root: &Path,
    paths: &[PathBuf],
    bindings: &[CompiledBinding],
    tx: &mpsc::Sender<WatchTrigger>,
) -> usize {
    let rel_paths: Vec<String> = paths
        .iter()
        .filter_map(|path| {
            let rel = relative_slash_path(root, path);
            if rel.is_none() {
                trace!(path = %path.display(), "event outside project root");
            }
            rel
        })
        .collect();

    let mut sent = 0;
    for binding in bindings {
        let Some(rel) = rel_paths.iter().find(|p| binding.matches(p)) else {
            continue;
        };
        debug!(pattern = binding.pattern(), path = %rel, tasks = ?binding.tasks(), "watch match");

        let trigger = WatchTrigger {
            binding: binding.id(),
            pattern: binding.pattern().to_string(),
            tasks: binding.tasks().to_vec(),
            path: rel.clone(),
        };
        if tx.send(trigger).await.is_err() {
            warn!("trigger channel closed; dropping file change");
            break;
        }
        sent += 1;
    }
    sent
}
