// src/watch/path_utils.rs

use std::path::Path;

/// `path` relative to `root` with forward slashes, as glob patterns expect.
///
/// Falls back to comparing canonical forms (symlinked temp dirs on macOS
/// report events under a different prefix). Returns `None` for paths
/// outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    // Removed files cannot be canonicalized; canonicalize the parent instead.
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };
    path_canon.strip_prefix(&root_canon).ok().map(normalize)
}

fn normalize(rel: &Path) -> String {
    let s = rel.to_string_lossy().replace('\\', "/");
    s.strip_prefix("./").map(str::to_string).unwrap_or(s)
}
