use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A sanitized path string paired with its absolute form.
///
/// Built once during validation so later stages never re-derive one form
/// from the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsObj {
    string: String,
    path: PathBuf,
}

impl FsObj {
    /// Resolve `normalized` against the current directory.
    ///
    /// # Errors
    ///
    /// Fails if the string is empty or the current directory is unavailable.
    pub fn new(normalized: impl Into<String>) -> io::Result<Self> {
        let string = normalized.into();
        let path = std::path::absolute(&string)?;
        Ok(Self { string, path })
    }

    /// The sanitized string as the user gave it.
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// Absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl fmt::Display for FsObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}
