// src/pipeline/steps/sass.rs

use std::path::Path;

use tracing::trace;

use crate::errors::StepError;
use crate::pipeline::transform::{blocking, Asset, StepContext, StepFuture, Transform};
use crate::types::OutputStyle;

#[derive(Debug)]
pub struct SassStep {
    style: OutputStyle,
}

impl SassStep {
    pub fn new(style: OutputStyle) -> Self {
        Self { style }
    }
}

fn grass_style(style: OutputStyle) -> grass::OutputStyle {
    match style {
        OutputStyle::Compressed => grass::OutputStyle::Compressed,
        OutputStyle::Nested | OutputStyle::Expanded | OutputStyle::Compact => {
            grass::OutputStyle::Expanded
        }
    }
}

/// `_name.scss` files are only ever imported.
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn compile(style: OutputStyle, asset: Asset) -> Result<Asset, StepError> {
    let source = String::from_utf8(asset.contents)
        .map_err(|_| StepError::new("sass", format!("{}: not valid UTF-8", asset.path.display())))?;

    let mut options = grass::Options::default().style(grass_style(style));
    if let Some(dir) = asset.origin.as_deref().and_then(Path::parent) {
        options = options.load_path(dir);
    }

    let css = grass::from_string(source, &options).map_err(|e| {
        let file = asset.origin.as_deref().unwrap_or(&asset.path);
        StepError::new("sass", format!("{}: {e}", file.display()))
    })?;

    Ok(Asset {
        path: asset.path.with_extension("css"),
        origin: asset.origin,
        contents: css.into_bytes(),
    })
}

impl Transform for SassStep {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        let style = self.style;
        Box::pin(async move {
            blocking("sass", move || {
                let mut out = Vec::with_capacity(assets.len());
                for asset in assets {
                    if is_partial(&asset.path) {
                        trace!(path = %asset.path.display(), "skipping partial");
                        continue;
                    }
                    out.push(compile(style, asset)?);
                }
                Ok(out)
            })
            .await
        })
    }
}
