// src/pipeline/steps/write.rs

use std::path::PathBuf;

use tracing::debug;

use crate::errors::StepError;
use crate::pipeline::dest::write_assets;
use crate::pipeline::transform::{blocking, Asset, StepContext, StepFuture, Transform};

/// Write the current files and pass them on unchanged, so a pipeline can
/// emit both `scripts.js` and a later `scripts.min.js`.
#[derive(Debug)]
pub struct WriteStep {
    dir: Option<PathBuf>,
}

impl WriteStep {
    pub fn new(dir: Option<&str>) -> Self {
        Self {
            dir: dir.map(PathBuf::from),
        }
    }
}

impl Transform for WriteStep {
    fn name(&self) -> &'static str {
        "write"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        let target = match &self.dir {
            Some(dir) => Some(ctx.root.join(dir)),
            None => ctx.dest.clone(),
        };
        let fs = ctx.fs.clone();
        Box::pin(async move {
            let Some(dir) = target else {
                return Err(StepError::new(
                    "write",
                    "no 'dir' given and the task has no 'dest'",
                ));
            };
            blocking("write", move || {
                let report = write_assets(fs.as_ref(), &dir, &assets)
                    .map_err(|e| StepError::new("write", format!("{e:#}")))?;
                debug!(dir = %dir.display(), written = report.written.len(), "intermediate write");
                Ok(assets)
            })
            .await
        })
    }
}
