// src/logging.rs

//! Logging setup: `tracing` events to STDERR through `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to `assetflow` only)
//! 2. `ASSETFLOW_LOG`, either a bare level (`debug`) or full directives
//!    (`assetflow=trace,tower_http=debug`)
//! 3. `info`
//!
//! The HTTP stack and the file watcher are capped at `warn` unless a
//! directive names them. `--dry-run` output goes to STDOUT.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ASSETFLOW_LOG";

const QUIET_DEPENDENCIES: &[&str] = &["hyper", "tower_http", "axum", "notify"];

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    EnvFilter::try_new(directives(cli_level, env))
        .map_err(|e| anyhow!("invalid {LOG_ENV_VAR} value: {e}"))
}

fn directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    let user = match (cli_level, env.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(lvl), _) => level_name(lvl).to_string(),
        (None, Some(raw)) => match parse_level_str(raw) {
            Some(level) => level.to_string(),
            None => raw.to_string(),
        },
        (None, None) => "info".to_string(),
    };

    let mut out = user.clone();
    for dep in QUIET_DEPENDENCIES {
        if !user.contains(dep) {
            out.push_str(&format!(",{dep}=warn"));
        }
    }
    out
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_environment() {
        let d = directives(Some(LogLevel::Debug), Some("trace"));
        assert!(d.starts_with("debug,"));
        assert!(d.contains("tower_http=warn"));
    }

    #[test]
    fn bare_level_alias_is_normalized() {
        assert!(directives(None, Some(" Warning ")).starts_with("warn,"));
        assert!(directives(None, None).starts_with("info,"));
    }

    #[test]
    fn explicit_dependency_directive_is_kept() {
        let d = directives(None, Some("assetflow=trace,notify=debug"));
        assert!(d.contains("notify=debug"));
        assert!(!d.contains("notify=warn"));
        assert!(d.contains("axum=warn"));
    }

    #[test]
    fn garbage_filter_is_an_error() {
        assert!(build_filter(None, Some("assetflow=loudest")).is_err());
    }
}
