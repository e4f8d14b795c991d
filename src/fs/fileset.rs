// src/fs/fileset.rs

//! Ordered glob sets resolved against a project root.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use super::FileSystem;

/// A file matched by a [`FileSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Path under the project root (root-joined).
    pub path: PathBuf,
    /// Path relative to the glob base of the pattern that matched it.
    pub relative: PathBuf,
}

#[derive(Clone)]
struct IncludePattern {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// Ordered include patterns plus `!`-prefixed excludes.
///
/// Resolution order: files from pattern 1 before files from pattern 2,
/// lexicographic within one pattern, duplicates keep their first position.
#[derive(Clone)]
pub struct FileSet {
    patterns: Vec<String>,
    includes: Vec<IncludePattern>,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl FileSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = GlobSetBuilder::new();
        let mut has_excludes = false;

        for raw in patterns {
            let raw = raw.as_ref();
            if let Some(negated) = raw.strip_prefix('!') {
                excludes.add(compile_glob(negated)?);
                has_excludes = true;
                continue;
            }
            let glob = compile_glob(raw)?;
            includes.push(IncludePattern {
                pattern: raw.to_string(),
                base: glob_base(raw),
                matcher: glob.compile_matcher(),
            });
        }

        let exclude = if has_excludes {
            Some(excludes.build().context("building exclude glob set")?)
        } else {
            None
        };

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            includes,
            exclude,
        })
    }

    /// Patterns as declared.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Walk the pattern bases under `root` and return the ordered matches.
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<MatchedFile>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut matched = Vec::new();

        for include in &self.includes {
            let mut hits: Vec<(String, PathBuf)> = Vec::new();
            let start = if include.base.as_os_str().is_empty() {
                root.to_path_buf()
            } else {
                root.join(&include.base)
            };
            for path in walk_files(fs, &start)? {
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if !include.matcher.is_match(&rel_str) {
                    continue;
                }
                if self.exclude.as_ref().is_some_and(|ex| ex.is_match(&rel_str)) {
                    continue;
                }
                hits.push((rel_str, path));
            }
            hits.sort_by(|a, b| a.0.cmp(&b.0));

            debug!(pattern = %include.pattern, matches = hits.len(), "resolved pattern");

            for (rel_str, path) in hits {
                if !seen.insert(path.clone()) {
                    continue;
                }
                let relative = Path::new(&rel_str)
                    .strip_prefix(&include.base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel_str));
                matched.push(MatchedFile { path, relative });
            }
        }

        Ok(matched)
    }
}

/// Collect every file below `start`. A missing start yields nothing; a
/// start that is itself a file yields just that file.
fn walk_files(fs: &dyn FileSystem, start: &Path) -> Result<Vec<PathBuf>> {
    if fs.is_file(start) {
        return Ok(vec![start.to_path_buf()]);
    }
    if !fs.is_dir(start) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![start.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Literal directory prefix of a pattern, before the first component that
/// contains a glob metacharacter. For a pattern without wildcards this is
/// the parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = normalize_pattern(pattern).split('/').collect();
    let mut base = PathBuf::new();

    for (i, component) in components.iter().enumerate() {
        let last = i + 1 == components.len();
        if last || component.contains(['*', '?', '[', '{']) {
            break;
        }
        if component.is_empty() || *component == "." {
            continue;
        }
        base.push(component);
    }
    base
}

/// Drop leading `./` components; candidate paths are matched without them.
pub fn normalize_pattern(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

/// Compile a glob where `*` does not cross `/` and `**` does.
pub(crate) fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(normalize_pattern(pattern))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/scss/**/*.scss"), PathBuf::from("src/scss"));
        assert_eq!(glob_base("src/js/app.js"), PathBuf::from("src/js"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("./src/{a,b}/*.js"), PathBuf::from("src"));
    }

    #[test]
    fn declared_order_wins_over_lexicographic() {
        let fs = MockFileSystem::with_files([
            ("./src/js/vendor/jquery.js", "jq"),
            ("./src/js/app.js", "app"),
            ("./src/js/main.js", "main"),
        ]);
        let set = FileSet::new(&["src/js/vendor/*.js", "src/js/*.js"]).unwrap();

        let files = set.resolve(&fs, Path::new(".")).unwrap();
        let rel: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("jquery.js"),
                PathBuf::from("app.js"),
                PathBuf::from("main.js"),
            ]
        );
    }

    #[test]
    fn dot_slash_patterns_match_like_plain_ones() {
        assert_eq!(normalize_pattern("./src/js/*.js"), "src/js/*.js");
        assert_eq!(normalize_pattern(".//./src/**"), "src/**");
        assert_eq!(normalize_pattern("src/./x"), "src/./x");

        let fs = MockFileSystem::with_files([
            ("./src/js/app.js", "app"),
            ("./src/js/old.js", "old"),
        ]);
        let plain = FileSet::new(&["src/js/*.js", "!src/js/old.js"]).unwrap();
        let dotted = FileSet::new(&["./src/js/*.js", "!./src/js/old.js"]).unwrap();

        let plain = plain.resolve(&fs, Path::new(".")).unwrap();
        let dotted = dotted.resolve(&fs, Path::new(".")).unwrap();
        assert_eq!(dotted.len(), 1);
        assert_eq!(dotted, plain);
        assert_eq!(dotted[0].relative, PathBuf::from("app.js"));
    }

    #[test]
    fn negated_patterns_exclude() {
        let fs = MockFileSystem::with_files([
            ("./img/a.png", "a"),
            ("./img/raw/b.png", "b"),
        ]);
        let set = FileSet::new(&["img/**/*.png", "!img/raw/**"]).unwrap();

        let files = set.resolve(&fs, Path::new(".")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("a.png"));
    }
}
