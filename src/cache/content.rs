// src/cache/content.rs

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{debug, warn};

use crate::cache::hash::{
    FileHashStore, HashStore, MemoryHashStore, compute_aggregate_hash, compute_bytes_hash,
};
use crate::fs::FileSystem;
use crate::types::CacheStorageMode;

/// Maps `(command, input bytes)` to the hash of the output the command
/// produced, so an unchanged input is not handed to the tool again.
pub struct ContentCache {
    store: Mutex<Box<dyn HashStore>>,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl ContentCache {
    pub fn new(store: Box<dyn HashStore>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryHashStore::new()))
    }

    /// Open the store selected by `[config].cache_storage`.
    pub fn for_mode(mode: CacheStorageMode, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let store: Box<dyn HashStore> = match mode {
            CacheStorageMode::File => Box::new(FileHashStore::open(root, fs)?),
            CacheStorageMode::Memory => Box::new(MemoryHashStore::new()),
        };
        debug!(?mode, "content cache ready");
        Ok(Self::new(store))
    }

    pub fn cache_key(command: &str, input: &[u8]) -> String {
        compute_aggregate_hash(&[compute_bytes_hash(command.as_bytes()), compute_bytes_hash(input)])
    }

    /// Output hash recorded for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.lock().and_then(|store| store.load(key))
    }

    /// Record that `key` produced output with `output_hash`.
    ///
    /// Store write failures are logged, not propagated: a missing entry only
    /// costs a redundant tool run next time.
    pub fn record(&self, key: &str, output_hash: &str) {
        let Some(mut store) = self.lock() else {
            return;
        };
        if let Err(err) = store.save(key, output_hash) {
            warn!(error = %err, "failed to persist content hash");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Option<std::sync::MutexGuard<'_, Box<dyn HashStore>>> {
        match self.store.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("content cache mutex poisoned; treating as empty");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_changes_with_command_and_input() {
        let base = ContentCache::cache_key("imagemin {input}", b"png");
        assert_ne!(base, ContentCache::cache_key("imagemin -o2 {input}", b"png"));
        assert_ne!(base, ContentCache::cache_key("imagemin {input}", b"jpg"));
        assert_eq!(base, ContentCache::cache_key("imagemin {input}", b"png"));
    }

    #[test]
    fn records_are_visible_to_lookup() {
        let cache = ContentCache::in_memory();
        assert!(cache.lookup("k").is_none());
        cache.record("k", "h");
        assert_eq!(cache.lookup("k").as_deref(), Some("h"));
        assert_eq!(cache.len(), 1);
    }
}
