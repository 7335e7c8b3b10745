//! Temporary catalog trees.
//!
//! [`CatalogFixture`] owns a temp directory laid out like a real catalog
//! root (`role/` and `tool/`). The directory is deleted when the fixture is
//! dropped, even if the test panics.

use std::fs;
use std::path::{Path, PathBuf};

use rolebook_core::{ConfigResolver, WalkOptions};
use tempfile::TempDir;

/// A catalog root in a temp directory.
pub struct CatalogFixture {
    dir: TempDir,
}

impl CatalogFixture {
    /// Create an empty root with no `role/` or `tool/` subtree.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// The catalog root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `role/<name>/role.yaml`.
    pub fn agent(self, name: &str, content: &str) -> Self {
        self.file(&format!("role/{name}/role.yaml"), content)
    }

    /// Write `tool/<rel_path>`, e.g. `"code/lint.yaml"`.
    pub fn tool(self, rel_path: &str, content: &str) -> Self {
        self.file(&format!("tool/{rel_path}"), content)
    }

    /// Write arbitrary bytes relative to the root, creating parents.
    pub fn bytes(self, rel_path: &str, content: &[u8]) -> Self {
        let path = self.path(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dirs");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        self
    }

    /// Write a text file relative to the root, creating parents.
    pub fn file(self, rel_path: &str, content: &str) -> Self {
        self.bytes(rel_path, content.as_bytes())
    }

    /// Create an empty directory relative to the root.
    pub fn dir(self, rel_path: &str) -> Self {
        fs::create_dir_all(self.path(rel_path)).expect("failed to create fixture dir");
        self
    }

    /// Absolute path of `rel_path` under the root.
    pub fn path(&self, rel_path: &str) -> PathBuf {
        self.root().join(rel_path)
    }

    /// A resolver over this root with default options.
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(self.root())
    }

    /// A resolver over this root with the given options.
    pub fn resolver_with(&self, options: WalkOptions) -> ConfigResolver {
        ConfigResolver::with_options(self.root(), options)
    }
}

impl Default for CatalogFixture {
    fn default() -> Self {
        Self::new()
    }
}
