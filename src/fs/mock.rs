// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Use absolute paths (e.g. `/project/src/index.html`); parent directories
/// are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        entries.insert(path.clone(), MockEntry::File(content.into()));
        if let Some(parent) = path.parent() {
            ensure_dir(&mut entries, parent);
            link_child(&mut entries, parent, &path);
        }
    }

    /// Contents of a file, if present (test assertions).
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(path.as_ref()) {
            Some(MockEntry::File(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// All file paths under `dir`, sorted.
    pub fn files_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = self
            .lock()
            .iter()
            .filter(|(p, e)| matches!(e, MockEntry::File(_)) && p.starts_with(dir))
            .map(|(p, _)| p.clone())
            .collect();
        files.sort();
        files
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a panicking test; keep going.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if path.as_os_str().is_empty() || entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = path.parent() {
        ensure_dir(entries, parent);
        link_child(entries, parent, path);
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        entries.get_mut(parent),
        child.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        entries.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
                children.retain(|c| c.as_str() != name.to_string_lossy());
            }
        }
        Ok(())
    }
}
