//! Invocation of the external `jar` tool.
//!
//! Archive encoding is not done here. The staged files are handed to the
//! archiver with the staging directory as working directory, and its combined
//! output is kept so a failure can be shown to the user verbatim.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::debug;

use crate::error::{DataError, PathErrorKind, context};
use crate::manifest::MANIFEST_FILE;

#[cfg(windows)]
const JAR_EXECUTABLE: &str = "jar.exe";
#[cfg(not(windows))]
const JAR_EXECUTABLE: &str = "jar";

#[derive(Error, Debug)]
pub enum ArchiverError {
    #[error("no archiver found (set JARI_ARCHIVER or JAVA_HOME, or put jar on PATH)")]
    NotFound,

    #[error("failed to start {}: {source}", program.display())]
    Spawn { program: PathBuf, source: io::Error },

    #[error("archiver exited with {status}:\n{output}")]
    Failed { status: ExitStatus, output: String },
}

impl From<ArchiverError> for DataError {
    fn from(err: ArchiverError) -> Self {
        match err {
            ArchiverError::Failed { output, .. } => Self::Archiver { output },
            ArchiverError::NotFound => {
                Self::path(JAR_EXECUTABLE, PathErrorKind::ExceptionRaised, context::ARCHIVER)
            }
            ArchiverError::Spawn { program, .. } => Self::path(
                program.display().to_string(),
                PathErrorKind::ExceptionRaised,
                context::ARCHIVER,
            ),
        }
    }
}

/// One archiver run.
#[derive(Debug, Clone)]
pub struct ArchiveJob<'a> {
    /// Staging directory, used as the working directory.
    pub working_dir: &'a Path,
    pub output: &'a Path,
    /// Names relative to `working_dir`: inputs first, then dependency jars.
    pub inputs: &'a [String],
    pub compress: bool,
}

impl ArchiveJob<'_> {
    /// `cfm` compresses, `cfm0` stores.
    pub fn mode(&self) -> &'static str {
        if self.compress { "cfm" } else { "cfm0" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archiver {
    program: PathBuf,
}

impl Archiver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find the archiver: `explicit`, then `JARI_ARCHIVER`, then
    /// `$JAVA_HOME/bin/jar`, then `jar` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::NotFound`] when none of them is available.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ArchiverError> {
        if let Some(program) = explicit {
            return Ok(Self::new(program));
        }
        if let Some(program) = std::env::var_os("JARI_ARCHIVER") {
            return Ok(Self::new(program));
        }
        if let Some(java_home) = std::env::var_os("JAVA_HOME") {
            let candidate = PathBuf::from(java_home).join("bin").join(JAR_EXECUTABLE);
            if candidate.is_file() {
                return Ok(Self::new(candidate));
            }
        }
        which::which(JAR_EXECUTABLE)
            .map(Self::new)
            .map_err(|_| ArchiverError::NotFound)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for `job`: `<mode> <output> MANIFEST.txt <inputs...>`.
    pub fn args(job: &ArchiveJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(job.inputs.len() + 3);
        args.push(job.mode().into());
        args.push(job.output.as_os_str().to_owned());
        args.push(MANIFEST_FILE.into());
        args.extend(job.inputs.iter().map(OsString::from));
        args
    }

    pub fn command(&self, job: &ArchiveJob<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args(job)).current_dir(job.working_dir);
        cmd
    }

    /// Run the archiver to completion.
    ///
    /// # Errors
    ///
    /// [`ArchiverError::Spawn`] if the process cannot start and
    /// [`ArchiverError::Failed`] with stdout followed by stderr on a
    /// non-zero exit.
    pub fn run(&self, job: &ArchiveJob<'_>) -> Result<(), ArchiverError> {
        debug!(program = %self.program.display(), mode = job.mode(), files = job.inputs.len(), "running archiver");

        let out = self
            .command(job)
            .output()
            .map_err(|source| ArchiverError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if out.status.success() {
            return Ok(());
        }

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Err(ArchiverError::Failed {
            status: out.status,
            output,
        })
    }
}
