// src/pipeline/steps/autoprefix.rs

use anyhow::Result;

use crate::pipeline::steps::external::ExternalFilter;
use crate::pipeline::transform::{Asset, StepContext, StepFuture, Transform};

/// Browser targets are passed to the prefixer through `BROWSERSLIST`.
pub const BROWSERS_ENV: &str = "BROWSERSLIST";

#[derive(Debug)]
pub struct AutoprefixStep {
    filter: ExternalFilter,
    browsers: Vec<String>,
}

impl AutoprefixStep {
    pub fn new(cmd: &str, browsers: Vec<String>, optional: bool) -> Result<Self> {
        Ok(Self {
            filter: ExternalFilter::new("autoprefix", cmd, optional)?,
            browsers,
        })
    }

    pub fn browsers_query(&self) -> String {
        self.browsers.join(", ")
    }
}

impl Transform for AutoprefixStep {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let env = [(BROWSERS_ENV, self.browsers_query())];
            self.filter.filter_each(assets, &env).await
        })
    }
}
