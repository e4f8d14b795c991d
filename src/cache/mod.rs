// src/cache/mod.rs

//! Content hashing and the persisted output cache used by `optimize` tasks.

pub mod content;
pub mod hash;

pub use content::ContentCache;
pub use hash::{
    FileHashStore, HASH_FILE_PATH, HashStore, MemoryHashStore, compute_aggregate_hash,
    compute_bytes_hash, compute_file_hash,
};
