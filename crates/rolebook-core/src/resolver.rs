//! Name-to-record resolution over a catalog root.
//!
//! A catalog root holds two differently shaped subtrees:
//!
//! ```text
//! <root>/role/<agent-name>/role.yaml     one directory per agent
//! <root>/tool/**/<tool-name>.yaml        tools anywhere in the subtree
//! ```
//!
//! [`ConfigResolver`] turns names into [`ConfigRecord`]s and lists what is
//! available. Lookups read the filesystem on every call and never write to
//! it; a missing definition is reported as `Ok(None)`, not as an error.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rolebook_config::CatalogConfig;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::name::{self, NameError};
use crate::record::{self, ConfigRecord, ParseError};
use crate::walk::{self, DefinitionWalker, TraversalError, WalkOptions};

/// Subdirectory of the root holding agent definitions.
pub const ROLE_DIR: &str = "role";
/// Subdirectory of the root holding tool definitions.
pub const TOOL_DIR: &str = "tool";
/// File name of an agent definition inside its directory.
pub const ROLE_FILE: &str = "role.yaml";

/// Errors from resolution, listing and tree checks.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error("{} resolves outside the catalog root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Which subtree a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Agent,
    Tool,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::Agent => write!(f, "agent"),
            DefinitionKind::Tool => write!(f, "tool"),
        }
    }
}

/// Outcome of checking one definition file.
#[derive(Debug)]
pub struct FileCheck {
    /// Agent or tool.
    pub kind: DefinitionKind,
    /// Agent directory name or tool stem.
    pub name: String,
    /// File that was checked.
    pub path: PathBuf,
    /// Number of keys parsed, or why the file could not be loaded.
    pub outcome: Result<usize, ResolveError>,
}

impl FileCheck {
    /// Whether the file loaded.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-file results of [`ConfigResolver::check_tree`].
#[derive(Debug, Default)]
pub struct TreeReport {
    /// Agents first, then tools, each in traversal order.
    pub files: Vec<FileCheck>,
}

impl TreeReport {
    /// Files that could not be loaded.
    pub fn failures(&self) -> impl Iterator<Item = &FileCheck> {
        self.files.iter().filter(|f| !f.is_ok())
    }

    /// Number of files that could not be loaded.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Whether every checked file loaded.
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Resolves agent and tool names below a fixed catalog root.
///
/// Holds no mutable state, so a shared reference can serve concurrent
/// lookups.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    root: PathBuf,
    options: WalkOptions,
}

impl ConfigResolver {
    /// Create a resolver over `root` with default traversal options.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, WalkOptions::default())
    }

    /// Create a resolver over `root` with explicit traversal options.
    pub fn with_options(root: impl Into<PathBuf>, options: WalkOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Create a resolver from the `[catalog]` config section.
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::with_options(config.root.clone(), WalkOptions::from(config))
    }

    /// The catalog root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The traversal options in effect.
    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    fn role_dir(&self) -> PathBuf {
        self.root.join(ROLE_DIR)
    }

    fn tool_dir(&self) -> PathBuf {
        self.root.join(TOOL_DIR)
    }

    fn walk(&self, dir: &Path, options: &WalkOptions) -> DefinitionWalker {
        DefinitionWalker::new(dir, options).within(&self.root)
    }

    /// Path of the definition file for agent `name`, if it exists.
    pub fn agent_path(&self, name: &str) -> Result<Option<PathBuf>, ResolveError> {
        let name = name::validate_name(name)?;
        let path = self.role_dir().join(name).join(ROLE_FILE);
        if is_regular_file(&path)? {
            Ok(Some(path))
        } else {
            debug!(agent = name, path = %path.display(), "agent definition not found");
            Ok(None)
        }
    }

    /// Path of the definition file for tool `name`, if one exists.
    ///
    /// `tool/<name>.<ext>` is checked first for each recognized extension in
    /// order; only when none exists is the whole `tool/` subtree searched.
    pub fn tool_path(&self, name: &str) -> Result<Option<PathBuf>, ResolveError> {
        let name = name::validate_name(name)?;
        let tool_dir = self.tool_dir();

        for ext in &self.options.extensions {
            let direct = tool_dir.join(format!("{name}.{ext}"));
            if is_regular_file(&direct)? {
                debug!(tool = name, path = %direct.display(), "tool found on direct path");
                return Ok(Some(direct));
            }
        }

        debug!(tool = name, "no direct tool file, searching subtree");
        for file in self.walk(&tool_dir, &self.options) {
            let file = file?;
            if file.stem == name {
                debug!(tool = name, path = %file.path.display(), "tool found in subtree");
                return Ok(Some(file.path));
            }
        }

        debug!(tool = name, "tool definition not found");
        Ok(None)
    }

    /// Load the record for agent `name`, or `None` if it has no definition.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve_agent(&self, name: &str) -> Result<Option<ConfigRecord>, ResolveError> {
        match self.agent_path(name)? {
            Some(path) => self.load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Load the record for tool `name`, or `None` if it has no definition.
    ///
    /// When several files share the name, the direct `tool/<name>.<ext>`
    /// file wins, and otherwise the first in depth-first name order.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve_tool(&self, name: &str) -> Result<Option<ConfigRecord>, ResolveError> {
        match self.tool_path(name)? {
            Some(path) => self.load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Sorted names of every directory under `role/` that holds a `role.yaml`.
    ///
    /// A missing `role/` directory yields an empty list.
    pub fn list_agents(&self) -> Result<Vec<String>, ResolveError> {
        let role_dir = self.role_dir();
        let entries = match fs::read_dir(&role_dir) {
            Ok(entries) => entries,
            Err(e) if is_absent(&e) => return Ok(Vec::new()),
            Err(e) => {
                return Err(TraversalError {
                    path: role_dir,
                    source: e,
                }
                .into());
            }
        };

        let mut agents = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| TraversalError {
                path: role_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !is_directory(&path)? {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %path.display(), "skipping agent directory with non UTF-8 name");
                continue;
            };
            if name::validate_name(&name).is_err() {
                debug!(agent = %name, "skipping agent directory with unusable name");
                continue;
            }
            if is_regular_file(&path.join(ROLE_FILE))? {
                agents.insert(name);
            }
        }

        Ok(agents.into_iter().collect())
    }

    /// Sorted, de-duplicated stems of every definition file under `tool/`.
    ///
    /// Files with the same stem at different depths appear once. A missing
    /// `tool/` directory yields an empty list.
    pub fn list_tools(&self) -> Result<Vec<String>, ResolveError> {
        let mut tools = BTreeSet::new();
        for file in self.walk(&self.tool_dir(), &self.options) {
            let file = file?;
            if name::validate_name(&file.stem).is_ok() {
                tools.insert(file.stem);
            }
        }
        Ok(tools.into_iter().collect())
    }

    /// Try to load every definition file under `role/` and `tool/`.
    ///
    /// Files under `role/` are reported as agents and named after the agent
    /// directory holding them; `role.yaml` is checked even when `yaml` is not
    /// a configured extension. Unreadable or non-text files are recorded per
    /// file; a directory that exists but cannot be listed aborts the check.
    pub fn check_tree(&self) -> Result<TreeReport, ResolveError> {
        let mut report = TreeReport::default();

        let role_dir = self.role_dir();
        let mut role_options = self.options.clone();
        if !role_options.is_definition(Path::new(ROLE_FILE))
            && let Some(ext) = Path::new(ROLE_FILE).extension().and_then(|e| e.to_str())
        {
            role_options.extensions.push(ext.to_string());
        }
        for file in self.walk(&role_dir, &role_options) {
            let file = file?;
            let is_role_file = file.path.file_name().is_some_and(|n| n == ROLE_FILE);
            if !is_role_file && !self.options.is_definition(&file.path) {
                continue;
            }
            let name = agent_name(&role_dir, &file.path).unwrap_or(file.stem);
            let outcome = self.load(&file.path).map(|record| record.len());
            report.files.push(FileCheck {
                kind: DefinitionKind::Agent,
                name,
                path: file.path,
                outcome,
            });
        }

        for file in self.walk(&self.tool_dir(), &self.options) {
            let file = file?;
            let outcome = self.load(&file.path).map(|record| record.len());
            report.files.push(FileCheck {
                kind: DefinitionKind::Tool,
                name: file.stem,
                path: file.path,
                outcome,
            });
        }

        debug!(
            files = report.files.len(),
            failures = report.failure_count(),
            "catalog check finished"
        );
        Ok(report)
    }

    /// Read and parse one definition file after confirming it lives under
    /// the root once symlinks are resolved.
    fn load(&self, path: &Path) -> Result<ConfigRecord, ResolveError> {
        self.ensure_within_root(path)?;
        let bytes = fs::read(path).map_err(|e| ResolveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        record::parse_bytes(&bytes).map_err(|e| ResolveError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn ensure_within_root(&self, path: &Path) -> Result<(), ResolveError> {
        let read_err = |p: &Path, e: io::Error| ResolveError::Read {
            path: p.to_path_buf(),
            source: e,
        };
        let root = walk::canonicalize_dir(&self.root).map_err(|e| read_err(&self.root, e))?;
        let target = fs::canonicalize(path).map_err(|e| read_err(path, e))?;
        if target.starts_with(&root) {
            Ok(())
        } else {
            Err(ResolveError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })
        }
    }
}

/// Name of the agent directory under `role_dir` that holds `path`, or
/// `None` for files directly inside `role_dir`.
fn agent_name(role_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(role_dir).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    components.next()?;
    first.as_os_str().to_str().map(str::to_string)
}

fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Whether `path` is a directory (following symlinks). A path that does not
/// exist is `false`; any other metadata failure is an error.
fn is_directory(path: &Path) -> Result<bool, ResolveError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if is_absent(&e) => Ok(false),
        Err(e) => Err(TraversalError {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}

/// Whether `path` is a regular file (following symlinks). A path that does
/// not exist is `false`; any other metadata failure is an error.
fn is_regular_file(path: &Path) -> Result<bool, ResolveError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if is_absent(&e) => Ok(false),
        Err(e) => Err(TraversalError {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}
