// src/cache/hash.rs

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Relative path (from the project root) to the hashes file.
pub const HASH_FILE_PATH: &str = ".assetdag/hashes";

/// Hash a file's contents, streaming.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn compute_bytes_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Combine several hashes into one. Order matters.
pub fn compute_aggregate_hash<S: AsRef<str>>(hashes: &[S]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Key/value storage for content hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hashes persisted at `<root>/.assetdag/hashes`, one `key hash` pair per
/// line. The file is read once on open and rewritten on every save.
pub struct FileHashStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    map: BTreeMap<String, String>,
}

impl FileHashStore {
    pub fn open(root: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let path = root.join(HASH_FILE_PATH);
        let map = if fs.exists(&path) {
            let text = fs
                .read_to_string(&path)
                .with_context(|| format!("reading hash file at {:?}", path))?;
            parse_hash_lines(&text)
        } else {
            BTreeMap::new()
        };
        debug!(path = ?path, entries = map.len(), "opened hash store");
        Ok(Self { path, fs, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let mut out = String::new();
        for (key, hash) in &self.map {
            let _ = writeln!(out, "{key} {hash}");
        }
        self.fs
            .write(&self.path, out.as_bytes())
            .with_context(|| format!("writing hash file at {:?}", self.path))
    }
}

impl HashStore for FileHashStore {
    fn load(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        if self.map.get(key).map(String::as_str) == Some(hash) {
            return Ok(());
        }
        self.map.insert(key.to_string(), hash.to_string());
        self.persist()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

fn parse_hash_lines(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.split_once(char::is_whitespace) {
            Some((key, hash)) => {
                map.insert(key.to_string(), hash.trim().to_string());
            }
            None => warn!(line = %trimmed, "ignoring malformed hash line"),
        }
    }
    map
}

/// Hashes kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
