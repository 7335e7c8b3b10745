//! Agent and tool name validation.
//!
//! Names are joined onto the catalog root to build lookup paths, so any
//! name that could address something outside its own directory is rejected
//! before a path is ever constructed.

/// Reasons a lookup name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,

    #[error("name {0:?} must not contain path separators")]
    Separator(String),

    #[error("name {0:?} must not contain '..'")]
    ParentSegment(String),

    #[error("name {0:?} must not contain NUL or control characters")]
    ControlCharacter(String),

    #[error("name {0:?} must not be '.'")]
    CurrentDir(String),
}

/// Check that `name` is a plain identifier that stays inside its directory.
///
/// Returns the name unchanged on success.
pub fn validate_name(name: &str) -> Result<&str, NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.contains(['/', '\\']) {
        return Err(NameError::Separator(name.to_string()));
    }
    if name.contains("..") {
        return Err(NameError::ParentSegment(name.to_string()));
    }
    if name.chars().any(char::is_control) {
        return Err(NameError::ControlCharacter(name.to_string()));
    }
    if name == "." {
        return Err(NameError::CurrentDir(name.to_string()));
    }
    Ok(name)
}
