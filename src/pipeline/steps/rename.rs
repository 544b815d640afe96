// src/pipeline/steps/rename.rs

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::pipeline::transform::{Asset, StepContext, StepFuture, Transform};

#[derive(Debug)]
pub struct RenameStep {
    to: Option<String>,
    suffix: Option<String>,
    extname: Option<String>,
}

impl RenameStep {
    pub fn new(to: Option<String>, suffix: Option<String>, extname: Option<String>) -> Result<Self> {
        if to.is_none() && suffix.is_none() && extname.is_none() {
            bail!("rename: one of 'to', 'suffix' or 'extname' is required");
        }
        if let Some(to) = &to {
            if to.is_empty() || to.contains('/') {
                bail!("rename: 'to' must be a plain file name (got '{to}')");
            }
        }
        Ok(Self {
            to,
            suffix,
            extname,
        })
    }

    /// Directory stays; `to` replaces the name, then `suffix` and `extname`
    /// adjust stem and extension.
    pub fn rename(&self, path: &std::path::Path) -> PathBuf {
        let mut path = match &self.to {
            Some(to) => path.with_file_name(to),
            None => path.to_path_buf(),
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match &self.extname {
            Some(e) => e.trim_start_matches('.').to_string(),
            None => path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let mut name = stem;
        if let Some(suffix) = &self.suffix {
            name.push_str(suffix);
        }
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext);
        }
        path.set_file_name(name);
        path
    }
}

impl Transform for RenameStep {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            Ok(assets
                .into_iter()
                .map(|mut asset| {
                    asset.path = self.rename(&asset.path);
                    asset
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn to_replaces_file_name() {
        let step = RenameStep::new(Some("scripts.min.js".into()), None, None).unwrap();
        assert_eq!(step.rename(Path::new("scripts.js")), PathBuf::from("scripts.min.js"));
        assert_eq!(step.rename(Path::new("lib/a.js")), PathBuf::from("lib/scripts.min.js"));
    }

    #[test]
    fn suffix_and_extname() {
        let step = RenameStep::new(None, Some(".min".into()), None).unwrap();
        assert_eq!(step.rename(Path::new("app.js")), PathBuf::from("app.min.js"));

        let step = RenameStep::new(None, None, Some(".css".into())).unwrap();
        assert_eq!(step.rename(Path::new("main.scss")), PathBuf::from("main.css"));
    }

    #[test]
    fn to_must_be_a_file_name() {
        assert!(RenameStep::new(Some("dir/x.js".into()), None, None).is_err());
    }
}
