//! Backend configuration.
//!
//! Defaults come from the host (`~/.jari`, processor count); every field can
//! be overridden from the environment with [`BackendConfig::from_env`] or set
//! explicitly with the `with_*` builders.

use std::path::PathBuf;

use dirs::home_dir;

use crate::dependency::DEFAULT_REPOSITORY;

/// Default number of dependencies downloaded at once in parallel mode.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Returns the jari home directory, or None if the user's home cannot be resolved.
pub fn try_jari_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("JARI_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".jari"))
}

/// Staging root: ~/.jari/tmp, falling back to the system temp directory.
pub fn default_staging_root() -> PathBuf {
    try_jari_home().map_or_else(std::env::temp_dir, |home| home.join("tmp"))
}

/// How a build is scheduled, derived from the processor count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// No processors reported: build on the submitting thread.
    Inline,
    /// One worker thread; dependencies are resolved before inputs are copied.
    Sequential,
    /// One worker thread driving a multi-threaded runtime; downloads run
    /// alongside input copying.
    Parallel,
}

impl ExecutionMode {
    pub fn from_processors(processors: usize) -> Self {
        match processors {
            0 => Self::Inline,
            1 => Self::Sequential,
            _ => Self::Parallel,
        }
    }

    pub fn is_inline(self) -> bool {
        self == Self::Inline
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the Maven layout repository.
    pub repository_url: String,
    /// Archiver executable. `None` means locate it at build time.
    pub archiver: Option<PathBuf>,
    /// Directory under which per-build staging directories are created.
    pub staging_root: PathBuf,
    pub processors: usize,
    pub max_concurrent_downloads: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            repository_url: DEFAULT_REPOSITORY.to_string(),
            archiver: None,
            staging_root: default_staging_root(),
            processors: num_cpus::get(),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

impl BackendConfig {
    /// Defaults overridden by `JARI_REPOSITORY_URL`, `JARI_ARCHIVER` and
    /// `JARI_PROCESSORS`. Unparseable processor counts are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            repository_url: std::env::var("JARI_REPOSITORY_URL")
                .unwrap_or(defaults.repository_url),
            archiver: std::env::var_os("JARI_ARCHIVER")
                .map(PathBuf::from)
                .or(defaults.archiver),
            processors: std::env::var("JARI_PROCESSORS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.processors),
            ..defaults
        }
    }

    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = url.into();
        self
    }

    pub fn with_archiver(mut self, program: impl Into<PathBuf>) -> Self {
        self.archiver = Some(program.into());
        self
    }

    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    pub fn with_processors(mut self, processors: usize) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.max_concurrent_downloads = limit.max(1);
        self
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_processors(self.processors)
    }
}
