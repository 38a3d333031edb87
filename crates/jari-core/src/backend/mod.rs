//! The build orchestrator.
//!
//! A [`Backend`] runs at most one build at a time. Callers submit a request,
//! then poll [`Backend::is_done`] / [`Backend::is_ok`] (or block with
//! [`Backend::wait`]) and collect the errors with [`Backend::take_errors`].
//!
//! # Scheduling
//!
//! The processor count in [`BackendConfig`] picks the [`ExecutionMode`]:
//!
//! - `0`: the build runs on the submitting thread before `submit` returns.
//! - `1`: a background worker downloads dependencies, then copies inputs.
//! - more: a background worker downloads and copies at the same time.
//!
//! A running build cannot be cancelled.

mod pipeline;
mod state;

pub use state::{JobPhase, JobSnapshot};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{info, warn};

use self::pipeline::Pipeline;
use self::state::{JobState, RunToken};
use crate::config::{BackendConfig, ExecutionMode};
use crate::dsl;
use crate::error::DataError;
use crate::reporter::{NullReporter, Reporter};
use crate::request::BuildRequest;
use crate::specification::{BuildPlan, BuildSpecification};

/// What happened to an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The configuration is valid and the build was started (or, inline,
    /// has already finished).
    Started,
    /// The configuration was rejected; its errors are in
    /// [`Backend::take_errors`].
    Invalid,
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("a build is already running")]
    Busy,

    #[error("failed to start build worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub struct Backend {
    config: Arc<BackendConfig>,
    state: Arc<JobState>,
    reporter: Arc<dyn Reporter>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_reporter(config, Arc::new(NullReporter))
    }

    pub fn with_reporter(config: BackendConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(JobState::new()),
            reporter,
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Validate `request` and start building it.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] if a build is running; nothing about that build
    /// is touched. [`SubmitError::Spawn`] if the worker thread cannot start,
    /// in which case the job is recorded as failed.
    pub fn submit(&self, request: BuildRequest) -> Result<SubmitOutcome, SubmitError> {
        let token = self.state.try_begin().ok_or(SubmitError::Busy)?;
        self.start(token, &request)
    }

    /// Build from discrete parameters.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_params<I, S>(
        &self,
        inputs: I,
        output: &str,
        dependencies: Vec<(String, String)>,
        main_class: &str,
        version: &str,
        use_compression: bool,
    ) -> Result<SubmitOutcome, SubmitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit(BuildRequest::from_params(
            inputs,
            output,
            dependencies,
            main_class,
            version,
            use_compression,
        ))
    }

    /// Parse DSL text and build it. Syntax errors make the submission
    /// [`Invalid`](SubmitOutcome::Invalid).
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_config(&self, text: &str) -> Result<SubmitOutcome, SubmitError> {
        let token = self.state.try_begin().ok_or(SubmitError::Busy)?;
        match dsl::parse_str(text) {
            Ok(request) => self.start(token, &request),
            Err(errors) => Ok(self.reject(token, errors)),
        }
    }

    fn start(&self, token: RunToken, request: &BuildRequest) -> Result<SubmitOutcome, SubmitError> {
        self.reporter.phase(JobPhase::Validating);
        let plan = match BuildSpecification::new(request, &self.config.repository_url).into_plan() {
            Ok(plan) => plan,
            Err(errors) => return Ok(self.reject(token, errors)),
        };

        let mode = self.config.execution_mode();
        info!(?mode, inputs = plan.inputs.len(), dependencies = plan.dependencies.len(), "build accepted");

        let config = Arc::clone(&self.config);
        let reporter = Arc::clone(&self.reporter);
        let job = move || run_job(&config, &*reporter, token, &plan);

        if mode == ExecutionMode::Inline {
            job();
            return Ok(SubmitOutcome::Started);
        }

        // the previous worker has published its result; let it exit
        self.join_worker();
        let handle = thread::Builder::new()
            .name("jari-build".to_string())
            .spawn(job)?;
        *self.lock_worker() = Some(handle);
        Ok(SubmitOutcome::Started)
    }

    fn reject(&self, token: RunToken, errors: Vec<DataError>) -> SubmitOutcome {
        info!(errors = errors.len(), "build rejected");
        token.finish(errors);
        self.reporter.phase(JobPhase::Idle);
        SubmitOutcome::Invalid
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// True once a build has finished and until the next one starts or the
    /// backend is [`reset`](Self::reset).
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// True only if the last build succeeded end to end.
    pub fn is_ok(&self) -> bool {
        self.state.is_ok()
    }

    pub fn phase(&self) -> JobPhase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    /// Remove and return the errors of the last build.
    pub fn take_errors(&self) -> Vec<DataError> {
        self.state.take_errors()
    }

    /// Block until the background worker, if any, has finished.
    pub fn wait(&self) {
        self.join_worker();
    }

    /// Forget the last build's result.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] while a build is running.
    pub fn reset(&self) -> Result<(), SubmitError> {
        if self.state.clear() {
            Ok(())
        } else {
            Err(SubmitError::Busy)
        }
    }

    /// Alias of [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] while a build is running.
    pub fn clear(&self) -> Result<(), SubmitError> {
        self.reset()
    }

    fn join_worker(&self) {
        let handle = self.lock_worker().take();
        if let Some(Err(_)) = handle.map(JoinHandle::join) {
            warn!("build worker panicked");
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_job(config: &BackendConfig, reporter: &dyn Reporter, token: RunToken, plan: &BuildPlan) {
    let pipeline = Pipeline {
        config,
        state: token.state(),
        reporter,
    };
    let errors = pipeline.run(plan);
    if errors.is_empty() {
        info!(output = %plan.output, "build succeeded");
    } else {
        warn!(errors = errors.len(), "build failed");
    }
    token.finish(errors);
    reporter.phase(JobPhase::Idle);
}
