// src/config/presets.rs

//! Built-in configurations for the conventional `src/` -> `dist/` layout.
//!
//! `full` cleans `dist/`, lints scripts and also emits `scripts.min.js`;
//! `lite` skips cleanup and lint and writes unminified `scripts.js` only.
//! External programs (prefixer, minifier, linter) are optional in both, so a
//! missing tool degrades to a pass-through with a warning.

use crate::config::loader::parse_str;
use crate::config::model::ConfigFile;
use crate::errors::ConfigError;
use crate::types::Preset;

const FULL: &str = r#"
[server]
root = "dist"
port = 1234
inject_changes = true

[task.reset]
clean = "dist"

[task.html]
src = ["src/*.html"]
dest = "dist"

[task.sass]
src = ["src/scss/**/*.scss"]
dest = "dist/css"
reload = "css"
steps = [
  { kind = "sass", output_style = "nested" },
  { kind = "autoprefix", browsers = ["last 2 versions", "ie 6-8"], optional = true },
]

[task.js]
src = ["src/js/lib/**/*.js"]
dest = "dist/js"
steps = [
  { kind = "concat", file = "scripts.js" },
  { kind = "write" },
  { kind = "minify", optional = true },
  { kind = "rename", to = "scripts.min.js" },
]

[task.lint-js]
src = ["src/js/lib/**/*.js"]
steps = [{ kind = "lint", reporter = "fail", optional = true }]

[task.img]
src = ["src/img/**/*.{png,jpg,JPG,gif,svg,ico}"]
exclude = ["src/img/sprites/**"]
dest = "dist/img"
steps = [{ kind = "imagemin", verbose = true }]

[task.server]
serve = true

[task.watch-html]
after = ["html"]
reload = "page"

[task.watch-js]
after = ["js"]
reload = "page"

[task.default]
sequence = ["reset", "html", ["sass", "js"], "server"]

[[watch]]
pattern = "src/*.html"
tasks = ["watch-html"]

[[watch]]
pattern = "src/scss/**/*.scss"
tasks = ["sass"]

[[watch]]
pattern = "src/js/lib/**/*.js"
tasks = ["watch-js"]
"#;

const LITE: &str = r#"
[server]
root = "dist"
port = 1234
inject_changes = true

[task.html]
src = ["src/*.html"]
dest = "dist"

[task.sass]
src = ["src/scss/**/*.scss"]
dest = "dist/css"
reload = "css"
steps = [
  { kind = "sass", output_style = "nested" },
  { kind = "autoprefix", browsers = ["last 2 versions", "ie 6-8"], optional = true },
]

[task.js]
src = ["src/js/lib/**/*.js"]
dest = "dist/js"
steps = [{ kind = "concat", file = "scripts.js" }]

[task.img]
src = ["src/img/**/*.{png,jpg,JPG,gif,svg,ico}"]
exclude = ["src/img/sprites/**"]
dest = "dist/img"
steps = [{ kind = "imagemin", verbose = true }]

[task.server]
serve = true

[task.watch-html]
after = ["html"]
reload = "page"

[task.watch-js]
after = ["js"]
reload = "page"

[task.default]
sequence = ["html", ["sass", "js"], "server"]

[[watch]]
pattern = "src/*.html"
tasks = ["watch-html"]

[[watch]]
pattern = "src/scss/**/*.scss"
tasks = ["sass"]

[[watch]]
pattern = "src/js/lib/**/*.js"
tasks = ["watch-js"]
"#;

/// TOML source of a preset, e.g. as a starting point for a config file.
pub fn source(preset: Preset) -> &'static str {
    match preset {
        Preset::Full => FULL,
        Preset::Lite => LITE,
    }
}

/// Parse and validate a preset exactly like a config file.
pub fn load(preset: Preset) -> Result<ConfigFile, ConfigError> {
    ConfigFile::try_from(parse_str(source(preset))?)
}
