use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Failed to get user's home directory!")]
pub struct NoHomeDir;

pub fn home_dir() -> Result<PathBuf, NoHomeDir> {
    home::home_dir().ok_or(NoHomeDir)
}

pub fn expand_home(path: impl AsRef<Path>) -> Result<PathBuf, NoHomeDir> {
    let path = path.as_ref();
    if let Ok(path) = path.strip_prefix("~") {
        Ok(home_dir()?.join(path))
    } else {
        Ok(path.to_owned())
    }
}

/// Drops trailing separators, so `Foo.xcodeproj/` names the same bundle as
/// `Foo.xcodeproj`.
pub fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && !path.is_empty() {
        "/"
    } else {
        trimmed
    }
}
