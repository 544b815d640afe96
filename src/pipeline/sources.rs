// src/pipeline/sources.rs

//! Source globs: which files a pipeline reads.
//!
//! Each include pattern is walked from its glob base, the static directory
//! prefix before the first wildcard component (`src/scss/**/*.scss` ->
//! `src/scss`). Output paths are relative to that base, so
//! `src/scss/main.scss` lands in `dest/main.css`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::{relative_slash_path, FileSystem};

/// A file selected by a `SourceSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (root-joined) path.
    pub path: PathBuf,
    /// Path relative to the pattern's glob base.
    pub relative: PathBuf,
}

#[derive(Debug)]
struct Include {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// Compiled include/exclude globs.
#[derive(Debug)]
pub struct SourceSet {
    includes: Vec<Include>,
    exclude: Option<GlobSet>,
}

/// `*` and `?` never cross `/`, as in shell globs.
pub fn compile_glob(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(normalize(pattern))
        .literal_separator(true)
        .build()
}

fn normalize(pattern: &str) -> &str {
    pattern.strip_prefix("./").unwrap_or(pattern)
}

/// Static directory prefix of a glob.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = normalize(pattern).split('/').collect();
    // The last component is a file pattern even without wildcards.
    let dirs = components.len().saturating_sub(1);

    for component in components.iter().take(dirs) {
        if component.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component);
    }

    base
}

impl SourceSet {
    pub fn new(include: &[String], exclude: &[String]) -> std::result::Result<Self, globset::Error> {
        let includes = include
            .iter()
            .map(|pattern| {
                Ok(Include {
                    pattern: pattern.clone(),
                    base: glob_base(pattern),
                    matcher: compile_glob(pattern)?.compile_matcher(),
                })
            })
            .collect::<std::result::Result<Vec<_>, globset::Error>>()?;

        let exclude = if exclude.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in exclude {
                builder.add(compile_glob(pattern)?);
            }
            Some(builder.build()?)
        };

        Ok(Self { includes, exclude })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(|i| i.pattern.as_str())
    }

    /// Whether a root-relative, slash-separated path is selected.
    pub fn matches(&self, rel: &str) -> bool {
        self.includes.iter().any(|i| i.matcher.is_match(rel)) && !self.is_excluded(rel)
    }

    fn is_excluded(&self, rel: &str) -> bool {
        self.exclude.as_ref().is_some_and(|set| set.is_match(rel))
    }

    /// Files currently matching, sorted by path. A missing base directory
    /// contributes no files. A file matched by several patterns is listed
    /// once, relative to the first pattern's base.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceFile>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for include in self.includes.iter() {
            let base_dir = root.join(&include.base);
            if !fs.is_dir(&base_dir) {
                debug!(pattern = %include.pattern, base = %base_dir.display(), "glob base missing");
                continue;
            }

            let mut found = Vec::new();
            walk(fs, &base_dir, &mut found)?;
            found.sort();

            for path in found {
                let Some(rel) = relative_slash_path(root, &path) else {
                    continue;
                };
                if !include.matcher.is_match(&rel) || self.is_excluded(&rel) {
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }
                let relative = path
                    .strip_prefix(&base_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel));
                out.push(SourceFile { path, relative });
            }
        }

        Ok(out)
    }
}

fn walk(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        if fs.is_dir(&entry) {
            walk(fs, &entry, out)?;
        } else if fs.is_file(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn set(include: &[&str], exclude: &[&str]) -> SourceSet {
        let inc: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exc: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        SourceSet::new(&inc, &exc).unwrap()
    }

    #[test]
    fn glob_base_is_static_prefix() {
        assert_eq!(glob_base("src/scss/**/*.scss"), PathBuf::from("src/scss"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("./src/js/lib/**/*.js"), PathBuf::from("src/js/lib"));
        assert_eq!(glob_base("index.html"), PathBuf::new());
        assert_eq!(glob_base("src/img/**/*.{png,jpg}"), PathBuf::from("src/img"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let s = set(&["src/*.html"], &[]);
        assert!(s.matches("src/index.html"));
        assert!(!s.matches("src/partials/nav.html"));
    }

    #[test]
    fn exclude_removes_sprites() {
        let s = set(&["src/img/**/*.{png,jpg}"], &["src/img/sprites/**"]);
        assert!(s.matches("src/img/logo.png"));
        assert!(s.matches("src/img/icons/a.jpg"));
        assert!(!s.matches("src/img/sprites/a.png"));
        assert!(!s.matches("src/img/logo.svg"));
    }

    #[test]
    fn collect_keeps_paths_relative_to_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/project/src/scss/main.scss", "a {}");
        fs.add_file("/project/src/scss/parts/_vars.scss", "$x: 1;");
        fs.add_file("/project/src/index.html", "<html>");

        let s = set(&["src/scss/**/*.scss"], &[]);
        let files = s.collect(&fs, Path::new("/project")).unwrap();
        let rel: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("main.scss"), PathBuf::from("parts/_vars.scss")]
        );
    }

    #[test]
    fn missing_base_yields_no_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/project/README.md", "hi");
        let s = set(&["src/js/lib/**/*.js"], &[]);
        assert!(s.collect(&fs, Path::new("/project")).unwrap().is_empty());
    }
}
