//! Deterministic depth-first traversal of a definition subtree.
//!
//! [`DefinitionWalker`] yields every file below a directory whose extension
//! is recognized, using an explicit stack instead of recursion. Entries at
//! each level are visited in file-name order, so the first match for a name
//! is the same on every filesystem.
//!
//! Descent is bounded by [`WalkOptions::max_depth`]. Symlinked directories
//! are skipped unless [`WalkOptions::follow_symlinks`] is set, in which case
//! every directory is tracked by its canonical path and never entered twice.
//! A walker bounded with [`DefinitionWalker::within`] also refuses to follow
//! a symlink to a directory outside that boundary.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rolebook_config::CatalogConfig;
use tracing::{debug, trace, warn};

/// An IO failure while reading a directory that exists.
#[derive(Debug, thiserror::Error)]
#[error("failed to read directory {}: {source}", path.display())]
pub struct TraversalError {
    /// The directory (or entry) that could not be read.
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl TraversalError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Canonical form of `path`, treating an empty path as the working directory.
pub(crate) fn canonicalize_dir(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        fs::canonicalize(".")
    } else {
        fs::canonicalize(path)
    }
}

/// Traversal settings shared by tool search, tool listing and tree checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Recognized extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Deepest directory level (1 = directly inside the walk root) whose
    /// files are visited.
    pub max_depth: usize,
    /// Whether symlinked directories are descended into.
    pub follow_symlinks: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

impl From<&CatalogConfig> for WalkOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            max_depth: config.max_depth,
            follow_symlinks: config.follow_symlinks,
        }
    }
}

impl WalkOptions {
    /// Whether `path` carries one of the recognized extensions.
    pub fn is_definition(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// A definition file found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name with the one recognized extension stripped.
    pub stem: String,
}

/// A directory entry waiting on the stack.
#[derive(Debug)]
struct Pending {
    path: PathBuf,
    depth: usize,
    is_dir: bool,
}

/// Iterator over definition files below a root directory.
///
/// A root that does not exist (or is not a directory) yields nothing. Any
/// other failure to read a directory is yielded once as an error, after
/// which the walk stops.
pub struct DefinitionWalker {
    options: WalkOptions,
    stack: Vec<Pending>,
    visited: HashSet<PathBuf>,
    boundary: Option<PathBuf>,
    failed: bool,
}

impl DefinitionWalker {
    /// Start a walk below `root`.
    pub fn new(root: &Path, options: &WalkOptions) -> Self {
        Self {
            options: options.clone(),
            stack: vec![Pending {
                path: root.to_path_buf(),
                depth: 0,
                is_dir: true,
            }],
            visited: HashSet::new(),
            boundary: None,
            failed: false,
        }
    }

    /// Only follow symlinked directories whose target lies under `boundary`.
    ///
    /// A boundary that cannot be resolved leaves the walk unbounded; the
    /// walk root below it is then missing as well.
    pub fn within(mut self, boundary: &Path) -> Self {
        match canonicalize_dir(boundary) {
            Ok(canonical) => self.boundary = Some(canonical),
            Err(e) => {
                debug!(boundary = %boundary.display(), error = %e, "walk boundary not resolvable")
            }
        }
        self
    }

    /// Read `dir` and push its children in reverse name order so they pop
    /// in ascending order.
    fn expand(&mut self, dir: &Path, depth: usize) -> Result<(), TraversalError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e)
                if depth == 0
                    && matches!(
                        e.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                    ) =>
            {
                debug!(dir = %dir.display(), "walk root does not exist");
                return Ok(());
            }
            Err(e) => return Err(TraversalError::new(dir, e)),
        };

        if self.options.follow_symlinks {
            let canonical = canonicalize_dir(dir).map_err(|e| TraversalError::new(dir, e))?;
            if let Some(boundary) = &self.boundary
                && !canonical.starts_with(boundary)
            {
                warn!(dir = %dir.display(), "directory resolves outside the catalog root, skipping");
                return Ok(());
            }
            if !self.visited.insert(canonical) {
                warn!(dir = %dir.display(), "directory already visited, skipping symlink cycle");
                return Ok(());
            }
        }

        trace!(dir = %dir.display(), depth, "reading directory");

        let mut children: Vec<(OsString, Pending)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TraversalError::new(dir, e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| TraversalError::new(&path, e))?;

            let is_dir = if file_type.is_symlink() {
                match fs::metadata(&path) {
                    Ok(target) if target.is_dir() && !self.options.follow_symlinks => {
                        warn!(path = %path.display(), "skipping symlinked directory");
                        continue;
                    }
                    Ok(target) => target.is_dir(),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "skipping dangling symlink");
                        continue;
                    }
                }
            } else {
                file_type.is_dir()
            };

            children.push((
                entry.file_name(),
                Pending {
                    path,
                    depth: depth + 1,
                    is_dir,
                },
            ));
        }

        children.sort_by(|a, b| b.0.cmp(&a.0));
        self.stack.extend(children.into_iter().map(|(_, pending)| pending));
        Ok(())
    }

    fn definition(&self, path: PathBuf) -> Option<DefinitionFile> {
        if !self.options.is_definition(&path) {
            return None;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => {
                debug!(path = %path.display(), "skipping file with non UTF-8 name");
                return None;
            }
        };
        Some(DefinitionFile { path, stem })
    }
}

impl Iterator for DefinitionWalker {
    type Item = Result<DefinitionFile, TraversalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some(pending) = self.stack.pop() {
            if !pending.is_dir {
                if let Some(file) = self.definition(pending.path) {
                    return Some(Ok(file));
                }
                continue;
            }

            if pending.depth >= self.options.max_depth {
                warn!(
                    dir = %pending.path.display(),
                    max_depth = self.options.max_depth,
                    "directory exceeds max depth, not descending"
                );
                continue;
            }

            if let Err(e) = self.expand(&pending.path, pending.depth) {
                self.failed = true;
                self.stack.clear();
                return Some(Err(e));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "name: x\n").unwrap();
    }

    fn walk(root: &Path, options: &WalkOptions) -> Vec<String> {
        DefinitionWalker::new(root, options)
            .map(|f| {
                let f = f.unwrap();
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = walk(&tmp.path().join("nope"), &WalkOptions::default());
        assert!(files.is_empty());
    }

    #[test]
    fn test_root_that_is_a_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "tool");
        let files = walk(&tmp.path().join("tool"), &WalkOptions::default());
        assert!(files.is_empty());
    }

    #[test]
    fn test_depth_first_name_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.yaml");
        touch(tmp.path(), "a/z.yaml");
        touch(tmp.path(), "a/inner/y.yaml");
        touch(tmp.path(), "c/x.yaml");
        touch(tmp.path(), "0.yaml");

        let files = walk(tmp.path(), &WalkOptions::default());
        assert_eq!(
            files,
            vec!["0.yaml", "a/inner/y.yaml", "a/z.yaml", "b.yaml", "c/x.yaml"]
        );
    }

    #[test]
    fn test_only_recognized_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep.yaml");
        touch(tmp.path(), "skip.yml");
        touch(tmp.path(), "skip.json");
        touch(tmp.path(), "README");
        touch(tmp.path(), ".yaml");

        assert_eq!(walk(tmp.path(), &WalkOptions::default()), vec!["keep.yaml"]);

        let options = WalkOptions {
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            ..WalkOptions::default()
        };
        assert_eq!(walk(tmp.path(), &options), vec!["keep.yaml", "skip.yml"]);
    }

    #[test]
    fn test_stem_strips_one_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "archive.tar.yaml");

        let file = DefinitionWalker::new(tmp.path(), &WalkOptions::default())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(file.stem, "archive.tar");
    }

    #[test]
    fn test_max_depth_limits_descent() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "top.yaml");
        touch(tmp.path(), "one/mid.yaml");
        touch(tmp.path(), "one/two/deep.yaml");

        let options = WalkOptions {
            max_depth: 2,
            ..WalkOptions::default()
        };
        assert_eq!(walk(tmp.path(), &options), vec!["one/mid.yaml", "top.yaml"]);

        let options = WalkOptions {
            max_depth: 1,
            ..WalkOptions::default()
        };
        assert_eq!(walk(tmp.path(), &options), vec!["top.yaml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_skipped_by_default() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "real/t.yaml");
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        assert_eq!(walk(tmp.path(), &WalkOptions::default()), vec!["real/t.yaml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates_when_following() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/t.yaml");
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("a/loop")).unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default()
        };
        assert_eq!(walk(tmp.path(), &options), vec!["a/t.yaml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_symlink_directory_is_walked() {
        let outside = TempDir::new().unwrap();
        touch(outside.path(), "shared.yaml");
        let tmp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked")).unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default()
        };
        assert_eq!(walk(tmp.path(), &options), vec!["linked/shared.yaml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_bounded_walk_skips_links_leaving_boundary() {
        let outside = TempDir::new().unwrap();
        touch(outside.path(), "shared.yaml");
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "common/inner.yaml");
        touch(tmp.path(), "tool/own.yaml");
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("tool/escape")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("common"), tmp.path().join("tool/common"))
            .unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default()
        };
        let tool_dir = tmp.path().join("tool");
        let files: Vec<String> = DefinitionWalker::new(&tool_dir, &options)
            .within(tmp.path())
            .map(|f| f.unwrap().stem)
            .collect();
        assert_eq!(files, vec!["inner", "own"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "ok.yaml");
        std::os::unix::fs::symlink(tmp.path().join("gone.yaml"), tmp.path().join("dead.yaml"))
            .unwrap();

        assert_eq!(walk(tmp.path(), &WalkOptions::default()), vec!["ok.yaml"]);
    }

    #[test]
    fn test_from_catalog_config() {
        let config = CatalogConfig {
            extensions: vec!["yml".to_string()],
            max_depth: 3,
            follow_symlinks: true,
            ..CatalogConfig::default()
        };
        let options = WalkOptions::from(&config);
        assert_eq!(options.extensions, vec!["yml"]);
        assert_eq!(options.max_depth, 3);
        assert!(options.follow_symlinks);
    }
}
