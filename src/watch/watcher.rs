// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::WatchError;
use crate::watch::bindings::CompiledBinding;
use crate::watch::event_handler::{process_file_change, WatchTrigger};

/// Keeps the underlying watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Watch `root` recursively and send a [`WatchTrigger`] for every binding a
/// changed path matches.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<CompiledBinding>,
    trigger_tx: mpsc::Sender<WatchTrigger>,
) -> Result<WatcherHandle, WatchError> {
    let root = root.into();
    // notify reports canonical paths on some platforms.
    let root = root.canonicalize().unwrap_or(root);
    let subscription_error = |e: notify::Error| WatchError::Subscription {
        pattern: root.display().to_string(),
        message: e.to_string(),
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(e) => warn!("file watch error: {e}"),
        },
        Config::default(),
    )
    .map_err(subscription_error)?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(subscription_error)?;

    let patterns: Vec<&str> = bindings.iter().map(|b| b.pattern()).collect();
    info!(root = %root.display(), ?patterns, "watching for changes");

    let bindings = Arc::new(bindings);
    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_content_change(&event.kind) {
                continue;
            }
            debug!(kind = ?event.kind, paths = ?event.paths, "file event");
            process_file_change(&root, &event.paths, &bindings, &trigger_tx).await;
            if trigger_tx.is_closed() {
                break;
            }
        }
        debug!("watch forwarder finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        forwarder,
    })
}
