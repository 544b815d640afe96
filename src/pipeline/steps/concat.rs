// src/pipeline/steps/concat.rs

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::pipeline::transform::{Asset, StepContext, StepFuture, Transform};

#[derive(Debug)]
pub struct ConcatStep {
    file: PathBuf,
    separator: Vec<u8>,
}

impl ConcatStep {
    pub fn new(file: &str, separator: &str) -> Result<Self> {
        if file.trim().is_empty() {
            bail!("concat: 'file' must not be empty");
        }
        Ok(Self {
            file: PathBuf::from(file),
            separator: separator.as_bytes().to_vec(),
        })
    }
}

impl Transform for ConcatStep {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            if assets.is_empty() {
                return Ok(Vec::new());
            }

            let mut contents = Vec::new();
            for (i, asset) in assets.into_iter().enumerate() {
                if i > 0 {
                    contents.extend_from_slice(&self.separator);
                }
                contents.extend(asset.contents);
            }
            Ok(vec![Asset::new(self.file.clone(), contents)])
        })
    }
}
