// src/fs/mock.rs

//! In-memory [`FileSystem`] for tests.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    /// Child names, in insertion order.
    Dir(Vec<String>),
}

/// Cheaply cloneable; clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    /// Empty tree containing only the root directory `.`.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Tree pre-populated with `(path, contents)` files.
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<Path>,
        C: Into<Vec<u8>>,
    {
        let fs = Self::new();
        for (path, contents) in files {
            fs.add_file(path, contents);
        }
        fs
    }

    /// Insert or replace a file, creating parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        entries.insert(path.clone(), MockEntry::File(content.into()));
        link_into_parent(&mut entries, &path);
    }

    /// Read back a file's bytes.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A panicking test thread must not poison the tree for other asserts.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}

/// Register `path` as a child of its parent, creating the parent chain.
fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }

    if !entries.contains_key(parent) {
        entries.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
        link_into_parent(entries, parent);
    }

    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        entries.get_mut(parent),
        path.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
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
}
