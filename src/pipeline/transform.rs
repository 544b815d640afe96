// src/pipeline/transform.rs

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::StepError;
use crate::fs::FileSystem;

/// A file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path, relative to the destination directory.
    pub path: PathBuf,
    /// Source file it was read from; `None` for synthesized files (concat).
    pub origin: Option<PathBuf>,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            origin: None,
            contents: contents.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Path used in log lines and error messages.
    pub fn display_path(&self) -> &Path {
        self.origin.as_deref().unwrap_or(&self.path)
    }
}

/// What a step may use besides its input files.
#[derive(Clone)]
pub struct StepContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// Absolute destination directory of the pipeline, if any.
    pub dest: Option<PathBuf>,
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("root", &self.root)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl StepContext {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>, dest: Option<PathBuf>) -> Self {
        Self { root, fs, dest }
    }
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Asset>, StepError>> + Send + 'a>>;

/// One pipeline step: an ordered set of files in, an ordered set out.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Step identity reported in `StepError`s.
    fn name(&self) -> &'static str;

    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a>;
}

/// Run blocking per-file work off the async runtime.
pub async fn blocking<T, F>(step: &'static str, f: F) -> Result<T, StepError>
where
    F: FnOnce() -> Result<T, StepError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StepError::new(step, format!("worker panicked: {e}")))?
}
