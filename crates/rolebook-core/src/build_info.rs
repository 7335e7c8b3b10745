//! Build metadata embedded by the build script, shown by `rolebook --version`.

/// Short git commit hash at build time, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("ROLEBOOK_GIT_HASH");

/// Cargo profile the crate was built with (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("ROLEBOOK_BUILD_PROFILE");

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version with commit and profile, e.g. `0.1.0 (abc1234, release)`.
pub const VERSION_LINE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ROLEBOOK_GIT_HASH"),
    ", ",
    env!("ROLEBOOK_BUILD_PROFILE"),
    ")"
);

/// Owned copy of [`VERSION_LINE`].
pub fn version_string() -> String {
    VERSION_LINE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_parts() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
        assert!(v.contains(BUILD_PROFILE));
        assert_eq!(v, format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})"));
    }

    #[test]
    fn test_git_hash_not_empty() {
        assert!(!GIT_HASH.is_empty());
    }
}
