// src/pipeline/steps/inline_css.rs

//! Replace `<link rel="stylesheet" href="...">` in HTML with the stylesheet's
//! contents in a `<style>` block. Remote and unresolvable stylesheets keep
//! their link tag.

use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::pipeline::transform::{blocking, Asset, StepContext, StepFuture, Transform};

#[derive(Debug, Clone)]
pub struct InlineCssStep {
    css_dir: PathBuf,
    link: Regex,
    attr: Regex,
}

impl InlineCssStep {
    pub fn new(css_dir: &str) -> Result<Self> {
        Ok(Self {
            css_dir: PathBuf::from(css_dir),
            link: Regex::new(r"(?i)<link\b[^>]*>")?,
            attr: Regex::new(r#"(?i)\b(rel|href)\s*=\s*["']([^"']*)["']"#)?,
        })
    }

    fn stylesheet_href<'t>(&self, tag: &'t str) -> Option<&'t str> {
        let mut is_stylesheet = false;
        let mut href = None;
        for caps in self.attr.captures_iter(tag) {
            let value = caps.get(2)?.as_str();
            match caps[1].to_ascii_lowercase().as_str() {
                "rel" => {
                    is_stylesheet = value
                        .split_whitespace()
                        .any(|v| v.eq_ignore_ascii_case("stylesheet"))
                }
                "href" => href = Some(value),
                _ => {}
            }
        }
        href.filter(|h| is_stylesheet && !is_remote(h))
    }

    /// Inline every resolvable stylesheet; returns the new document and how
    /// many links were replaced.
    pub fn inline(&self, html: &str, fs: &dyn FileSystem, css_root: &Path) -> (String, usize) {
        let mut inlined = 0;
        let out = self.link.replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let Some(href) = self.stylesheet_href(tag) else {
                return tag.to_string();
            };
            let Some(rel) = inside_css_root(href) else {
                warn!(href, "stylesheet outside the css directory; not inlining");
                return tag.to_string();
            };
            let path = css_root.join(rel);
            match fs.read(&path) {
                Ok(css) => {
                    inlined += 1;
                    format!("<style>\n{}\n</style>", String::from_utf8_lossy(&css).trim_end())
                }
                Err(e) => {
                    warn!(href, path = %path.display(), "cannot inline stylesheet: {e:#}");
                    tag.to_string()
                }
            }
        });
        (out.into_owned(), inlined)
    }
}

/// `href` as a path under the css root, unless it climbs out of it.
fn inside_css_root(href: &str) -> Option<&Path> {
    let rel = Path::new(href.trim_start_matches('/'));
    let escapes = rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    (!escapes).then_some(rel)
}

fn is_remote(href: &str) -> bool {
    href.starts_with("//") || href.contains("://") || href.starts_with("data:")
}

fn is_html(asset: &Asset) -> bool {
    matches!(asset.extension(), Some("html" | "htm"))
}

impl Transform for InlineCssStep {
    fn name(&self) -> &'static str {
        "inline_css"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        let step = self.clone();
        let fs = ctx.fs.clone();
        let css_root = ctx.root.join(&self.css_dir);
        Box::pin(async move {
            blocking("inline_css", move || {
                Ok(assets
                    .into_iter()
                    .map(|mut asset| {
                        if !is_html(&asset) {
                            return asset;
                        }
                        let Ok(html) = std::str::from_utf8(&asset.contents) else {
                            warn!(file = %asset.path.display(), "not UTF-8; left as is");
                            return asset;
                        };
                        let (out, inlined) = step.inline(html, fs.as_ref(), &css_root);
                        if inlined > 0 {
                            debug!(file = %asset.path.display(), inlined, "inlined stylesheets");
                            asset.contents = out.into_bytes();
                        }
                        asset
                    })
                    .collect())
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn local_stylesheets_are_inlined() {
        let fs = MockFileSystem::new();
        fs.add_file("/project/dist/css/main.css", "a { color: red; }\n");
        let ctx = StepContext::new(PathBuf::from("/project"), Arc::new(fs), None);

        let html = concat!(
            "<head>",
            r#"<link rel="stylesheet" href="css/main.css">"#,
            r#"<link rel="stylesheet" href="https://cdn.example.com/x.css">"#,
            r#"<link rel="icon" href="favicon.ico">"#,
            "</head>"
        );
        let step = InlineCssStep::new("dist").unwrap();
        let out = step
            .apply(vec![Asset::new("index.html", html)], &ctx)
            .await
            .unwrap();

        let text = String::from_utf8(out[0].contents.clone()).unwrap();
        assert!(text.contains("<style>\na { color: red; }\n</style>"));
        assert!(text.contains("https://cdn.example.com/x.css"));
        assert!(text.contains("favicon.ico"));
        assert!(!text.contains("css/main.css"));
    }

    #[tokio::test]
    async fn missing_stylesheet_keeps_link() {
        let ctx = StepContext::new(PathBuf::from("/project"), Arc::new(MockFileSystem::new()), None);
        let html = r#"<link href="/css/gone.css" rel="stylesheet">"#;
        let step = InlineCssStep::new("dist").unwrap();
        let out = step
            .apply(vec![Asset::new("index.html", html)], &ctx)
            .await
            .unwrap();
        assert_eq!(out[0].contents, html.as_bytes());
    }

    #[test]
    fn parent_dir_href_is_not_inlined() {
        let fs = MockFileSystem::new();
        fs.add_file("/project/secret.css", "token { }");
        fs.add_file("/project/dist/css/main.css", "a { }");

        let step = InlineCssStep::new("dist").unwrap();
        let html = concat!(
            r#"<link rel="stylesheet" href="../secret.css">"#,
            r#"<link rel="stylesheet" href="css/../../secret.css">"#,
            r#"<link rel="stylesheet" href="css/main.css">"#,
        );
        let (out, inlined) = step.inline(html, &fs, Path::new("/project/dist"));

        assert_eq!(inlined, 1);
        assert!(!out.contains("token"));
        assert!(out.contains(r#"href="../secret.css""#));
        assert!(out.contains("a { }"));
    }
}
