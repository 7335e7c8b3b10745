#![deny(unsafe_code)]

//! Configuration loading and validation for Rolebook.
//!
//! Loads TOML configuration files and validates them. Provides the
//! [`AppConfig`] type as the central configuration structure; the
//! [`CatalogConfig`] section describes where the agent/tool tree lives and
//! how it may be traversed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog (role/tool tree) configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reporter output configuration.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the catalog lives and how it is searched.
///
/// ## TOML Example
///
/// ```toml
/// [catalog]
/// root = "/srv/agents"
/// extensions = ["yaml", "yml"]
/// max_depth = 16
/// follow_symlinks = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory containing the `role/` and `tool/` subtrees.
    #[serde(default = "default_catalog_root")]
    pub root: PathBuf,

    /// File extensions (without the leading dot) recognized as tool and
    /// role definitions, in fast-path lookup order.
    #[serde(default = "default_catalog_extensions")]
    pub extensions: Vec<String>,

    /// Maximum directory depth below `tool/` that recursive search descends.
    #[serde(default = "default_catalog_max_depth")]
    pub max_depth: usize,

    /// Whether symlinked directories are descended into.
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: default_catalog_root(),
            extensions: default_catalog_extensions(),
            max_depth: default_catalog_max_depth(),
            follow_symlinks: false,
        }
    }
}

fn default_catalog_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_catalog_extensions() -> Vec<String> {
    vec!["yaml".to_string()]
}

fn default_catalog_max_depth() -> usize {
    32
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reporter output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// How many tool names the overview prints before summarising the rest.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
        }
    }
}

fn default_preview_limit() -> usize {
    10
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    ///
    /// A relative `catalog.root` is resolved against the directory that
    /// contains the config file. A bare file name such as `rolebook.toml`
    /// has an empty parent and leaves the root relative to the working
    /// directory.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut config = Self::parse(&content)?;
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.catalog.root = config.resolve_root(dir);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve `catalog.root` against `base` when it is relative. An empty
    /// `base` means the working directory.
    pub fn resolve_root(&self, base: &Path) -> PathBuf {
        let base = if base.as_os_str().is_empty() {
            Path::new(".")
        } else {
            base
        };
        if self.catalog.root.is_absolute() {
            self.catalog.root.clone()
        } else if self.catalog.root == Path::new(".") {
            base.to_path_buf()
        } else {
            base.join(&self.catalog.root)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "catalog.root must not be empty".to_string(),
            ));
        }
        if self.catalog.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "catalog.extensions must list at least one extension".to_string(),
            ));
        }
        for (i, ext) in self.catalog.extensions.iter().enumerate() {
            if ext.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "catalog.extensions[{i}] must not be empty"
                )));
            }
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "catalog.extensions[{i}] must not start with a dot, got {ext:?}"
                )));
            }
            if ext.contains(['/', '\\', '.']) {
                return Err(ConfigError::Validation(format!(
                    "catalog.extensions[{i}] must be a single extension, got {ext:?}"
                )));
            }
        }
        if self.catalog.max_depth == 0 {
            return Err(ConfigError::Validation(
                "catalog.max_depth must be at least 1".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace", "off"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        if self.report.preview_limit == 0 {
            return Err(ConfigError::Validation(
                "report.preview_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
