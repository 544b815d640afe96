// src/pipeline/dest.rs

//! Writing pipeline output.
//!
//! A file whose current contents hash to the same `blake3` digest is left
//! untouched, so rebuilds do not bump mtimes of unchanged output.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::pipeline::transform::Asset;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
}

pub fn write_assets(fs: &dyn FileSystem, dir: &Path, assets: &[Asset]) -> Result<WriteReport> {
    let mut report = WriteReport::default();

    for asset in assets {
        let target = dir.join(&asset.path);
        if is_unchanged(fs, &target, &asset.contents) {
            trace!(path = %target.display(), "output unchanged; skipping write");
            report.unchanged += 1;
            continue;
        }
        fs.write(&target, &asset.contents)?;
        debug!(path = %target.display(), bytes = asset.contents.len(), "wrote output");
        report.written.push(target);
    }

    Ok(report)
}

fn is_unchanged(fs: &dyn FileSystem, target: &Path, contents: &[u8]) -> bool {
    if !fs.is_file(target) {
        return false;
    }
    match fs.read(target) {
        Ok(existing) => blake3::hash(&existing) == blake3::hash(contents),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn second_identical_write_is_skipped() {
        let fs = MockFileSystem::new();
        let dir = Path::new("/project/dist/css");
        let assets = vec![Asset::new("main.css", "a{}")];

        let first = write_assets(&fs, dir, &assets).unwrap();
        assert_eq!(first.written, vec![PathBuf::from("/project/dist/css/main.css")]);

        let second = write_assets(&fs, dir, &assets).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 1);

        let changed = write_assets(&fs, dir, &[Asset::new("main.css", "b{}")]).unwrap();
        assert_eq!(changed.written.len(), 1);
        assert_eq!(fs.contents("/project/dist/css/main.css").unwrap(), b"b{}");
    }
}
