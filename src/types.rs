use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Live-reload signal a task emits after it completes successfully.
///
/// - `Page`: connected browsers do a full page refresh.
/// - `Css`: connected browsers swap their stylesheets in place (falls back to
///   `Page` when the dev server has `inject_changes = false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    Page,
    Css,
}

impl ReloadKind {
    /// Wire message sent to the browser client.
    pub fn as_message(self) -> &'static str {
        match self {
            ReloadKind::Page => "page",
            ReloadKind::Css => "css",
        }
    }
}

impl FromStr for ReloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "page" => Ok(ReloadKind::Page),
            "css" => Ok(ReloadKind::Css),
            other => Err(format!(
                "invalid reload kind: {other} (expected \"page\" or \"css\")"
            )),
        }
    }
}

/// Output style accepted by the stylesheet compile step.
///
/// The compiler only distinguishes expanded and compressed output; `nested`
/// and `compact` are accepted for compatibility and render as expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Nested,
    Expanded,
    Compact,
    Compressed,
}

impl FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nested" => Ok(OutputStyle::Nested),
            "expanded" => Ok(OutputStyle::Expanded),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(format!(
                "invalid output_style: {other} (expected nested, expanded, compact or compressed)"
            )),
        }
    }
}

/// How the lint step reports diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LintReporter {
    /// Log diagnostics, never fail the task.
    #[default]
    Stylish,
    /// Any diagnostic fails the task.
    Fail,
}

/// Built-in configuration presets.
///
/// The project historically shipped two build configurations; both are kept
/// as presets rather than picking one as canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// reset + lint + minified scripts.
    Full,
    /// No cleanup, no lint, unminified scripts only.
    Lite,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Full => write!(f, "full"),
            Preset::Lite => write!(f, "lite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_kind_parses_case_insensitively() {
        assert_eq!("CSS".parse::<ReloadKind>(), Ok(ReloadKind::Css));
        assert_eq!(" page ".parse::<ReloadKind>(), Ok(ReloadKind::Page));
        assert!("inject".parse::<ReloadKind>().is_err());
    }

    #[test]
    fn output_style_defaults_to_nested() {
        assert_eq!(OutputStyle::default(), OutputStyle::Nested);
        assert_eq!("compressed".parse::<OutputStyle>(), Ok(OutputStyle::Compressed));
    }
}
