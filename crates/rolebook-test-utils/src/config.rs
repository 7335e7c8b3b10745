//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use rolebook_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .root(fixture.root())
///     .extensions(&["yaml", "yml"])
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn root(mut self, root: &Path) -> Self {
        self.config.catalog.root = root.to_path_buf();
        self
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.config.catalog.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.catalog.max_depth = depth;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.catalog.follow_symlinks = follow;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.config.report.preview_limit = limit;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
