// src/pipeline/steps/lint.rs

use anyhow::Result;
use regex::Regex;
use tracing::{info, warn};

use crate::errors::StepError;
use crate::pipeline::steps::external::{ExternalFilter, FilterOutput};
use crate::pipeline::transform::{Asset, StepContext, StepFuture, Transform};
use crate::types::LintReporter;

const DIAGNOSTIC_PATTERN: &str =
    r"(?m)^(?P<file>[^:\n]+):(?P<line>\d+):(?P<col>\d+):\s*(?P<message>.+)$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Parse `file:line:col: message` lines; anything else is ignored.
pub fn parse_diagnostics(pattern: &Regex, output: &str) -> Vec<Diagnostic> {
    pattern
        .captures_iter(output)
        .filter_map(|caps| {
            Some(Diagnostic {
                line: caps["line"].parse().ok()?,
                column: caps["col"].parse().ok()?,
                message: caps["message"].trim().to_string(),
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct LintStep {
    filter: ExternalFilter,
    reporter: LintReporter,
    pattern: Regex,
}

impl LintStep {
    pub fn new(cmd: &str, reporter: LintReporter, optional: bool) -> Result<Self> {
        Ok(Self {
            filter: ExternalFilter::new("lint", cmd, optional)?,
            reporter,
            pattern: Regex::new(DIAGNOSTIC_PATTERN)?,
        })
    }

    fn report(&self, asset: &Asset, diagnostics: &[Diagnostic]) -> Result<(), StepError> {
        let file = asset.display_path().display();
        for d in diagnostics {
            warn!(file = %file, line = d.line, column = d.column, "{}", d.message);
        }
        match (self.reporter, diagnostics.first()) {
            (LintReporter::Fail, Some(first)) => Err(StepError::new(
                "lint",
                format!(
                    "{file}: {} problem(s), first at {}:{}: {}",
                    diagnostics.len(),
                    first.line,
                    first.column,
                    first.message
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl Transform for LintStep {
    fn name(&self) -> &'static str {
        "lint"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let mut clean = 0usize;
            for asset in assets.iter() {
                // Linters exit non-zero when they find problems; parse
                // stdout either way.
                let (stdout, stderr, success) =
                    match self.filter.spawn(&[], asset.contents.clone()).await? {
                        FilterOutput::Missing => {
                            self.filter.missing()?;
                            continue;
                        }
                        FilterOutput::Finished {
                            stdout,
                            stderr,
                            success,
                        } => (String::from_utf8_lossy(&stdout).into_owned(), stderr, success),
                    };

                let diagnostics = parse_diagnostics(&self.pattern, &stdout);
                if !success && diagnostics.is_empty() {
                    return Err(StepError::new(
                        "lint",
                        format!("{}: linter failed: {stderr}", asset.display_path().display()),
                    ));
                }
                if diagnostics.is_empty() {
                    clean += 1;
                }
                self.report(asset, &diagnostics)?;
            }
            info!(files = assets.len(), clean, "lint finished");
            Ok(assets)
        })
    }
}
