//! Per-build staging directories.
//!
//! Inputs and downloaded dependencies are gathered in a fresh directory
//! before the archiver runs. The directory belongs to exactly one build and
//! is removed when the build ends, whatever the outcome.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{DataError, PathErrorKind, context};
use crate::fs_obj::FsObj;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("failed to create staging directory under {}: {source}", root.display())]
    Create { root: PathBuf, source: io::Error },

    #[error("failed to copy {}: {source}", path.display())]
    Copy { path: PathBuf, source: io::Error },

    #[error("failed to walk {}: {source}", root.display())]
    Walk { root: PathBuf, source: walkdir::Error },

    #[error("input {} has no file name", path.display())]
    NoFileName { path: PathBuf },
}

impl StagingError {
    fn path(&self) -> &Path {
        match self {
            Self::Create { root, .. } => root,
            Self::Walk { root, source } => source.path().unwrap_or(root),
            Self::Copy { path, .. } | Self::NoFileName { path } => path,
        }
    }
}

impl From<StagingError> for DataError {
    fn from(err: StagingError) -> Self {
        Self::path(
            err.path().display().to_string(),
            PathErrorKind::ExceptionRaised,
            context::STAGING,
        )
    }
}

/// A uniquely named directory removed on [`close`](Self::close) or drop.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    removed: bool,
}

impl StagingDir {
    /// Create a fresh directory under `root`, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::Create`] if either directory cannot be created.
    pub fn create(root: &Path) -> Result<Self, StagingError> {
        let create_err = |source| StagingError::Create {
            root: root.to_path_buf(),
            source,
        };
        fs::create_dir_all(root).map_err(create_err)?;
        let dir = tempfile::Builder::new()
            .prefix("jari-build-")
            .tempdir_in(root)
            .map_err(create_err)?;

        let path = dir.keep();
        debug!(path = %path.display(), "staging directory created");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure; removal still continues past it.
    pub fn close(mut self) -> io::Result<()> {
        self.removed = true;
        remove_tree(&self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
        }
    }
}

/// What [`copy_inputs`] put into the staging directory.
#[derive(Debug, Default)]
pub struct StagedInputs {
    /// Top-level names to archive, duplicates collapsed.
    pub names: Vec<String>,
    /// Names whose every entry was copied.
    pub clean: Vec<String>,
    pub errors: Vec<StagingError>,
}

/// Copy each input to `<dest>/<input file name>`, recursing into directories.
///
/// A failed entry does not stop the rest of the copy.
pub fn copy_inputs(dest: &Path, inputs: &[FsObj]) -> StagedInputs {
    let mut staged = StagedInputs::default();

    for input in inputs {
        let Some(name) = input.file_name() else {
            staged.errors.push(StagingError::NoFileName {
                path: input.path().to_path_buf(),
            });
            continue;
        };

        let before = staged.errors.len();
        copy_tree(input.path(), &dest.join(name), &mut staged.errors);
        if staged.errors.len() == before {
            debug!(input = %input, "input staged");
            if !staged.clean.iter().any(|n| n == name) {
                staged.clean.push(name.to_string());
            }
        } else {
            staged.clean.retain(|n| n != name);
        }
        if !staged.names.iter().any(|n| n == name) {
            staged.names.push(name.to_string());
        }
    }

    staged
}

fn copy_tree(src: &Path, target: &Path, errors: &mut Vec<StagingError>) {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                errors.push(StagingError::Walk {
                    root: src.to_path_buf(),
                    source,
                });
                continue;
            }
        };

        let relative = entry.path().strip_prefix(src).unwrap_or(Path::new(""));
        let dest = target.join(relative);
        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
        } else {
            dest.parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::copy(entry.path(), &dest).map(drop))
        };

        if let Err(source) = result {
            errors.push(StagingError::Copy {
                path: entry.path().to_path_buf(),
                source,
            });
        }
    }
}

/// Remove `root` and everything below it without recursion.
///
/// Entries that vanish while the walk is in progress are not errors. The
/// first real failure is returned after every other entry has been tried.
pub fn remove_tree(root: &Path) -> io::Result<()> {
    let mut first_err: Option<io::Error> = None;
    let mut record = |err: io::Error| {
        if err.kind() != io::ErrorKind::NotFound && first_err.is_none() {
            first_err = Some(err);
        }
    };

    let mut stack = vec![root.to_path_buf()];
    let mut dirs = Vec::new();

    while let Some(path) = stack.pop() {
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                record(e);
                continue;
            }
        };

        if !meta.is_dir() {
            if let Err(e) = fs::remove_file(&path) {
                record(e);
            }
            continue;
        }

        match fs::read_dir(&path) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok(entry) => stack.push(entry.path()),
                        Err(e) => record(e),
                    }
                }
            }
            Err(e) => record(e),
        }
        dirs.push(path);
    }

    // children were pushed after their parents
    for dir in dirs.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            record(e);
        }
    }

    first_err.map_or(Ok(()), Err)
}
