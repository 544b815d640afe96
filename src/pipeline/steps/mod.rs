// src/pipeline/steps/mod.rs

//! Built-in pipeline steps.
//!
//! Each step is configured inline in a task's `steps` list, tagged by
//! `kind`:
//!
//! ```toml
//! steps = [
//!   { kind = "concat", file = "scripts.js" },
//!   { kind = "write" },
//!   { kind = "minify", optional = true },
//!   { kind = "rename", to = "scripts.min.js" },
//! ]
//! ```

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::pipeline::transform::Transform;
use crate::types::{LintReporter, OutputStyle};

pub mod autoprefix;
pub mod concat;
pub mod external;
pub mod imagemin;
pub mod inline_css;
pub mod lint;
pub mod minify;
pub mod rename;
pub mod sass;
pub mod write;

pub const DEFAULT_PREFIX_CMD: &str = "postcss --use autoprefixer --no-map";
pub const DEFAULT_MINIFY_CMD: &str = "esbuild --minify --loader=js";
pub const DEFAULT_LINT_CMD: &str = "jshint --reporter=unix -";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepConfig {
    /// Compile `.scss` to `.css`.
    Sass {
        #[serde(default)]
        output_style: OutputStyle,
    },
    /// Add vendor prefixes with an external program.
    Autoprefix {
        #[serde(default = "default_browsers")]
        browsers: Vec<String>,
        #[serde(default = "default_prefix_cmd")]
        cmd: String,
        #[serde(default)]
        optional: bool,
    },
    /// Join all files into one.
    Concat {
        file: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// Minify scripts with an external program.
    Minify {
        #[serde(default = "default_minify_cmd")]
        cmd: String,
        #[serde(default)]
        optional: bool,
    },
    Rename {
        /// Replace the whole file name.
        #[serde(default)]
        to: Option<String>,
        /// Append to the file stem (`.min` turns `a.js` into `a.min.js`).
        #[serde(default)]
        suffix: Option<String>,
        /// Replace the extension, dot included.
        #[serde(default)]
        extname: Option<String>,
    },
    /// Losslessly recompress images.
    Imagemin {
        #[serde(default)]
        verbose: bool,
        /// Re-encode JPEGs at this quality (1-100). Off by default.
        #[serde(default)]
        jpeg_quality: Option<u8>,
    },
    /// Report script problems; `reporter = "fail"` fails the task on any.
    Lint {
        #[serde(default = "default_lint_cmd")]
        cmd: String,
        #[serde(default)]
        reporter: LintReporter,
        #[serde(default)]
        optional: bool,
    },
    /// Replace stylesheet links in HTML with inline `<style>` blocks.
    InlineCss {
        /// Directory that stylesheet hrefs resolve against.
        #[serde(default = "default_css_dir")]
        css_dir: String,
    },
    /// Write the current files and keep going.
    Write {
        /// Defaults to the task's `dest`.
        #[serde(default)]
        dir: Option<String>,
    },
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

fn default_prefix_cmd() -> String {
    DEFAULT_PREFIX_CMD.to_string()
}

fn default_minify_cmd() -> String {
    DEFAULT_MINIFY_CMD.to_string()
}

fn default_lint_cmd() -> String {
    DEFAULT_LINT_CMD.to_string()
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_css_dir() -> String {
    "dist".to_string()
}

impl StepConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::Sass { .. } => "sass",
            StepConfig::Autoprefix { .. } => "autoprefix",
            StepConfig::Concat { .. } => "concat",
            StepConfig::Minify { .. } => "minify",
            StepConfig::Rename { .. } => "rename",
            StepConfig::Imagemin { .. } => "imagemin",
            StepConfig::Lint { .. } => "lint",
            StepConfig::InlineCss { .. } => "inline_css",
            StepConfig::Write { .. } => "write",
        }
    }

    pub fn build(&self) -> Result<Box<dyn Transform>> {
        let step: Box<dyn Transform> = match self {
            StepConfig::Sass { output_style } => Box::new(sass::SassStep::new(*output_style)),
            StepConfig::Autoprefix {
                browsers,
                cmd,
                optional,
            } => Box::new(autoprefix::AutoprefixStep::new(cmd, browsers.clone(), *optional)?),
            StepConfig::Concat { file, separator } => {
                Box::new(concat::ConcatStep::new(file, separator)?)
            }
            StepConfig::Minify { cmd, optional } => {
                Box::new(minify::MinifyStep::new(cmd, *optional)?)
            }
            StepConfig::Rename {
                to,
                suffix,
                extname,
            } => Box::new(rename::RenameStep::new(
                to.clone(),
                suffix.clone(),
                extname.clone(),
            )?),
            StepConfig::Imagemin {
                verbose,
                jpeg_quality,
            } => {
                if let Some(q) = jpeg_quality {
                    if !(1..=100).contains(q) {
                        bail!("imagemin: jpeg_quality must be between 1 and 100 (got {q})");
                    }
                }
                Box::new(imagemin::ImageminStep::new(*verbose, *jpeg_quality))
            }
            StepConfig::Lint {
                cmd,
                reporter,
                optional,
            } => Box::new(lint::LintStep::new(cmd, *reporter, *optional)?),
            StepConfig::InlineCss { css_dir } => Box::new(inline_css::InlineCssStep::new(css_dir)?),
            StepConfig::Write { dir } => Box::new(write::WriteStep::new(dir.as_deref())),
        };
        Ok(step)
    }
}
