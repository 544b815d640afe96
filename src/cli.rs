// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Preset;

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build static-site assets from a task graph, then serve and watch them.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Defaults to `[config].default_task` (usually `default`).
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// If the file does not exist and no `--preset` is given, the `full`
    /// preset is used.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml")]
    pub config: String,

    /// Use a built-in configuration instead of a config file.
    #[arg(long, value_enum, value_name = "PRESET")]
    pub preset: Option<PresetArg>,

    /// Run the task once and exit; never watch, stop the dev server afterwards.
    #[arg(long)]
    pub once: bool,

    /// Parse + validate, print the execution plan, but run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Full,
    Lite,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Full => Preset::Full,
            PresetArg::Lite => Preset::Lite,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
