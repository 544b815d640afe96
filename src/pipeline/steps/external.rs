// src/pipeline/steps/external.rs

//! Running external filter programs (prefixer, minifier, linter).
//!
//! A filter reads one file on stdin and writes the result to stdout. Steps
//! marked `optional` pass files through unchanged when the program is not
//! installed; otherwise a missing program fails the step.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::StepError;
use crate::pipeline::transform::Asset;

/// A program plus its arguments, split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn parse(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("empty command");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum FilterOutput {
    Finished {
        stdout: Vec<u8>,
        stderr: String,
        success: bool,
    },
    /// The program is not installed.
    Missing,
}

/// Pipe `input` through `cmd`.
pub async fn run_filter(
    cmd: &CommandLine,
    env: &[(&str, String)],
    input: Vec<u8>,
) -> std::io::Result<FilterOutput> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FilterOutput::Missing),
        Err(e) => return Err(e),
    };

    // Write stdin concurrently so a large output cannot deadlock the pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            let res = stdin.write_all(&input).await;
            drop(stdin);
            res
        })
    });

    let output = child.wait_with_output().await?;
    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // The program may exit without reading all of stdin.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(std::io::Error::other(e)),
        }
    }

    Ok(FilterOutput::Finished {
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
    })
}

/// Shared driver for "one file in, one file out" external steps.
#[derive(Debug)]
pub struct ExternalFilter {
    step: &'static str,
    cmd: CommandLine,
    optional: bool,
    warned: AtomicBool,
}

impl ExternalFilter {
    pub fn new(step: &'static str, cmd: &str, optional: bool) -> Result<Self> {
        let cmd = CommandLine::parse(cmd).map_err(|e| anyhow::anyhow!("{step}: {e}"))?;
        Ok(Self {
            step,
            cmd,
            optional,
            warned: AtomicBool::new(false),
        })
    }

    /// Replace each asset's contents with the program's stdout.
    pub async fn filter_each(
        &self,
        assets: Vec<Asset>,
        env: &[(&str, String)],
    ) -> Result<Vec<Asset>, StepError> {
        let mut out = Vec::with_capacity(assets.len());
        for mut asset in assets {
            if let Some(stdout) = self.invoke(&asset, env, asset.contents.clone()).await? {
                asset.contents = stdout;
            }
            out.push(asset);
        }
        Ok(out)
    }

    pub async fn spawn(
        &self,
        env: &[(&str, String)],
        input: Vec<u8>,
    ) -> Result<FilterOutput, StepError> {
        run_filter(&self.cmd, env, input)
            .await
            .map_err(|e| StepError::new(self.step, format!("running '{}': {e}", self.cmd)))
    }

    /// Missing-program policy: optional steps warn once and pass through.
    pub fn missing(&self) -> Result<(), StepError> {
        if !self.optional {
            return Err(StepError::new(
                self.step,
                format!("program '{}' not found", self.cmd.program),
            ));
        }
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!(step = self.step, program = %self.cmd.program, "program not found; passing files through");
        }
        Ok(())
    }

    /// Run the program for one asset. `None` means the program is missing
    /// and the step is optional.
    async fn invoke(
        &self,
        asset: &Asset,
        env: &[(&str, String)],
        input: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, StepError> {
        match self.spawn(env, input).await? {
            FilterOutput::Missing => self.missing().map(|()| None),
            FilterOutput::Finished {
                stdout,
                stderr,
                success: true,
            } => {
                if !stderr.is_empty() {
                    debug!(step = self.step, file = %asset.display_path().display(), "{stderr}");
                }
                Ok(Some(stdout))
            }
            FilterOutput::Finished { stderr, .. } => Err(StepError::new(
                self.step,
                format!("{}: {stderr}", asset.display_path().display()),
            )),
        }
    }
}
