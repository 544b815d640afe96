// src/pipeline/mod.rs

//! Pipeline actions: read a source set, run it through an ordered chain of
//! steps, write the result to a destination directory.
//!
//! - [`sources`] compiles globs and finds matching files.
//! - [`transform`] defines [`Asset`], [`StepContext`] and the [`Transform`] trait.
//! - [`steps`] holds the built-in steps and their serde configuration.
//! - [`dest`] writes output, skipping unchanged files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::StepError;

pub mod dest;
pub mod sources;
pub mod steps;
pub mod transform;

pub use sources::{SourceFile, SourceSet};
pub use steps::StepConfig;
pub use transform::{Asset, StepContext, Transform};

/// Ordered steps bound to a source set and an optional destination.
pub struct Pipeline {
    sources: SourceSet,
    steps: Vec<Box<dyn Transform>>,
    dest: Option<PathBuf>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("src", &self.sources.patterns().collect::<Vec<_>>())
            .field("steps", &steps)
            .field("dest", &self.dest)
            .finish()
    }
}

impl Pipeline {
    pub fn new(sources: SourceSet, steps: Vec<Box<dyn Transform>>, dest: Option<PathBuf>) -> Self {
        Self {
            sources,
            steps,
            dest,
        }
    }

    pub fn from_config(
        src: &[String],
        exclude: &[String],
        dest: Option<&str>,
        steps: &[StepConfig],
    ) -> anyhow::Result<Self> {
        let sources = SourceSet::new(src, exclude).context("invalid source glob")?;
        let steps = steps
            .iter()
            .map(StepConfig::build)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(sources, steps, dest.map(PathBuf::from)))
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Destination directory relative to the project root.
    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Source files read.
    pub read: usize,
    /// Files written by the final destination write.
    pub written: Vec<PathBuf>,
    /// Output files skipped because their contents did not change.
    pub unchanged: usize,
}

/// Read, transform, write.
///
/// No matching source files is a success with zero outputs. A failing step
/// aborts the pipeline; files already written by earlier steps stay.
pub async fn run(
    ctx: &StepContext,
    pipeline: &Arc<Pipeline>,
    task: &str,
) -> Result<PipelineReport, StepError> {
    let assets = read_sources(ctx, pipeline).await?;
    let mut report = PipelineReport {
        read: assets.len(),
        ..Default::default()
    };

    if assets.is_empty() {
        info!(task = %task, "no source files matched; nothing to do");
        return Ok(report);
    }

    let mut assets = assets;
    for step in pipeline.steps.iter() {
        let before = assets.len();
        assets = step.apply(assets, ctx).await?;
        debug!(task = %task, step = step.name(), files_in = before, files_out = assets.len(), "step done");
    }

    if let Some(dir) = ctx.dest.clone() {
        let fs = ctx.fs.clone();
        let written = transform::blocking("dest", move || {
            dest::write_assets(fs.as_ref(), &dir, &assets)
                .map_err(|e| StepError::new("dest", format!("{e:#}")))
        })
        .await?;
        report.written = written.written;
        report.unchanged = written.unchanged;
    }

    info!(
        task = %task,
        read = report.read,
        written = report.written.len(),
        unchanged = report.unchanged,
        "pipeline finished"
    );
    Ok(report)
}

async fn read_sources(ctx: &StepContext, pipeline: &Arc<Pipeline>) -> Result<Vec<Asset>, StepError> {
    let fs = ctx.fs.clone();
    let root = ctx.root.clone();
    let pipeline = pipeline.clone();

    transform::blocking("src", move || {
        let files = pipeline
            .sources
            .collect(fs.as_ref(), &root)
            .map_err(|e| StepError::new("src", format!("{e:#}")))?;

        files
            .into_iter()
            .map(|file| {
                let contents = fs
                    .read(&file.path)
                    .map_err(|e| StepError::new("src", format!("{e:#}")))?;
                Ok(Asset::new(file.relative, contents).with_origin(file.path))
            })
            .collect()
    })
    .await
}
