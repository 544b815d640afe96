// src/pipeline/steps/minify.rs

use anyhow::Result;

use crate::pipeline::steps::external::ExternalFilter;
use crate::pipeline::transform::{Asset, StepContext, StepFuture, Transform};

#[derive(Debug)]
pub struct MinifyStep {
    filter: ExternalFilter,
}

impl MinifyStep {
    pub fn new(cmd: &str, optional: bool) -> Result<Self> {
        Ok(Self {
            filter: ExternalFilter::new("minify", cmd, optional)?,
        })
    }
}

impl Transform for MinifyStep {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(self.filter.filter_each(assets, &[]))
    }
}
