//! Errors surfaced to callers of the build pipeline.
//!
//! Every stage reports problems as [`DataError`] values. Stages never stop at
//! the first failure when independent work remains, so callers always receive
//! a flat list. Internal plumbing errors (network, staging I/O) have their own
//! enums and are converted into a `DataError` at the orchestrator boundary.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Labels attached to [`DataError::Path`] describing which field failed.
pub mod context {
    pub const INPUT: &str = "Input Directory";
    pub const OUTPUT: &str = "Output Directory";
    pub const MAIN_CLASS: &str = "Main Class-Path";
    pub const DEPENDENCY: &str = "Dependency";
    pub const DEPENDENCY_VERSION: &str = "Dependency Version";
    pub const STAGING: &str = "Staging";
    pub const MANIFEST: &str = "Manifest";
    pub const ARCHIVER: &str = "Archiver";
    pub const VERSION: &str = "Version";
    pub const BACKEND: &str = "Backend";
}

/// Classification produced by path and identifier validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathErrorKind {
    Empty,
    SingleCharacter,
    SeparatorMissing,
    NonExistent,
    /// The value could not be turned into a path or the I/O around it failed.
    ExceptionRaised,
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Empty => "was empty",
            Self::SingleCharacter => "single-character",
            Self::SeparatorMissing => "no separator present",
            Self::NonExistent => "non-existent",
            Self::ExceptionRaised => "unable to access",
        };
        f.write_str(text)
    }
}

/// A problem with the build configuration or with one step of a build.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataError {
    #[error("{context}: {}", describe_path(.path, .kind))]
    Path {
        path: String,
        kind: PathErrorKind,
        context: &'static str,
    },

    #[error("{field}: \"{value}\", not a number")]
    NotANumber { value: String, field: &'static str },

    #[error("Unexpected {found}{}, line {line}", expected_suffix(.expected.as_deref()))]
    Syntax {
        found: String,
        line: usize,
        expected: Option<String>,
    },

    #[error("Archiver failed:\n{output}")]
    Archiver { output: String },

    #[error("Dependency {coordinate}: {reason}")]
    Dependency { coordinate: String, reason: String },
}

impl DataError {
    pub fn path(path: impl Into<String>, kind: PathErrorKind, context: &'static str) -> Self {
        Self::Path {
            path: path.into(),
            kind,
            context,
        }
    }

    pub fn syntax(found: impl Into<String>, line: usize, expected: Option<&str>) -> Self {
        Self::Syntax {
            found: found.into(),
            line,
            expected: expected.map(str::to_string),
        }
    }

    /// Human readable description, identical to the `Display` output.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Returns the path error kind when this is a [`DataError::Path`].
    pub fn path_kind(&self) -> Option<PathErrorKind> {
        match self {
            Self::Path { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn describe_path(path: &str, kind: &PathErrorKind) -> String {
    if *kind == PathErrorKind::Empty {
        format!("*empty*, {kind}")
    } else {
        format!("\"{path}\", {kind}")
    }
}

fn expected_suffix(expected: Option<&str>) -> String {
    expected.map_or_else(String::new, |e| format!(", expected {e}"))
}
