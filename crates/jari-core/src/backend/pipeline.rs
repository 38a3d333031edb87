//! One build, from staging to cleanup.
//!
//! Runs on whichever thread the backend picked for the job. Every step adds
//! its failures to one list; once the list is non-empty the remaining steps
//! are skipped, but the staging directory is always removed.

use std::path::Path;
use std::thread;

use reqwest::Client;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use super::state::{JobPhase, JobState};
use crate::archiver::{ArchiveJob, Archiver};
use crate::config::{BackendConfig, ExecutionMode};
use crate::dependency::{DependencyResolver, Resolution};
use crate::error::{DataError, PathErrorKind, context};
use crate::manifest;
use crate::reporter::Reporter;
use crate::specification::BuildPlan;
use crate::staging::{self, StagedInputs, StagingDir};

pub(crate) struct Pipeline<'a> {
    pub(crate) config: &'a BackendConfig,
    pub(crate) state: &'a JobState,
    pub(crate) reporter: &'a dyn Reporter,
}

impl Pipeline<'_> {
    fn enter(&self, phase: JobPhase) {
        info!(%phase, "build phase");
        self.state.set_phase(phase);
        self.reporter.phase(phase);
    }

    /// Run `plan` to completion and return every error it hit.
    pub(crate) fn run(&self, plan: &BuildPlan) -> Vec<DataError> {
        self.enter(JobPhase::Staging);
        let staging = match StagingDir::create(&self.config.staging_root) {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "could not create staging directory");
                return vec![err.into()];
            }
        };

        let mut errors = Vec::new();
        let files = self.stage(plan, staging.path(), &mut errors);

        if errors.is_empty() {
            errors.extend(check_main_class(plan, staging.path()));
        }

        if errors.is_empty() {
            self.enter(JobPhase::ManifestWriting);
            let main = plan.main_class.as_ref().map(|m| m.dotted());
            if let Err(e) = manifest::write(staging.path(), plan.version, main) {
                warn!(error = %e, "failed to write manifest");
                errors.push(DataError::path(
                    staging.path().join(manifest::MANIFEST_FILE).display().to_string(),
                    PathErrorKind::ExceptionRaised,
                    context::MANIFEST,
                ));
            }
        }

        if errors.is_empty() {
            self.enter(JobPhase::Archiving);
            if let Err(err) = self.archive(plan, staging.path(), &files) {
                errors.push(err);
            }
        }

        self.enter(JobPhase::Cleanup);
        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            warn!(path = %staging_path.display(), error = %e, "failed to remove staging directory");
            self.reporter
                .warning(&format!("could not remove {}: {e}", staging_path.display()));
        }

        errors
    }

    /// Copy inputs and download dependencies into `dest`.
    ///
    /// Returns the names to archive: inputs first, then dependency jars in
    /// the order they finished downloading.
    fn stage(&self, plan: &BuildPlan, dest: &Path, errors: &mut Vec<DataError>) -> Vec<String> {
        if plan.dependencies.is_empty() {
            let staged = staging::copy_inputs(dest, &plan.inputs);
            return self.collect(staged, Resolution::default(), errors);
        }

        // block_on panics on a thread that already drives a runtime, which is
        // where an inline build runs when the caller is async
        let fetched = if Handle::try_current().is_ok() {
            thread::scope(|scope| {
                thread::Builder::new()
                    .name("jari-fetch".into())
                    .spawn_scoped(scope, || self.fetch(plan, dest))
                    .map_err(|e| e.to_string())
                    .and_then(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|_| Err("fetch thread panicked".to_string()))
                    })
            })
        } else {
            self.fetch(plan, dest)
        };

        match fetched {
            Ok((staged, resolution)) => self.collect(staged, resolution, errors),
            Err(reason) => {
                warn!(%reason, "staging failed");
                errors.push(DataError::path(
                    dest.display().to_string(),
                    PathErrorKind::ExceptionRaised,
                    context::STAGING,
                ));
                Vec::new()
            }
        }
    }

    /// Download dependencies on a fresh runtime, copying inputs alongside
    /// in parallel mode and afterwards otherwise.
    fn fetch(&self, plan: &BuildPlan, dest: &Path) -> Result<(StagedInputs, Resolution), String> {
        let mode = self.config.execution_mode();
        let runtime = runtime_for(mode).map_err(|e| format!("failed to start async runtime: {e}"))?;
        let client = Client::builder()
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let resolver = DependencyResolver::new(client, self.reporter);
        let limit = self.config.max_concurrent_downloads;

        if mode == ExecutionMode::Parallel {
            runtime.block_on(async {
                let target = dest.to_path_buf();
                let inputs = plan.inputs.clone();
                let copy =
                    tokio::task::spawn_blocking(move || staging::copy_inputs(&target, &inputs));
                let (copied, resolution) =
                    tokio::join!(copy, resolver.resolve_all(&plan.dependencies, dest, limit));
                copied
                    .map(|staged| (staged, resolution))
                    .map_err(|e| format!("input copy task failed: {e}"))
            })
        } else {
            let resolution = runtime.block_on(resolver.resolve_all(&plan.dependencies, dest, 1));
            Ok((staging::copy_inputs(dest, &plan.inputs), resolution))
        }
    }

    fn collect(
        &self,
        staged: StagedInputs,
        resolution: Resolution,
        errors: &mut Vec<DataError>,
    ) -> Vec<String> {
        for name in &staged.clean {
            self.reporter.input_staged(name);
        }
        for err in staged.errors {
            warn!(error = %err, "failed to stage input");
            errors.push(err.into());
        }
        errors.extend(resolution.errors);

        let mut files = staged.names;
        files.extend(resolution.file_names);
        debug!(count = files.len(), "staged files");
        files
    }

    fn archive(&self, plan: &BuildPlan, staging: &Path, files: &[String]) -> Result<(), DataError> {
        let output = plan.output.path();
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                warn!(path = %parent.display(), error = %e, "failed to create output directory");
                DataError::path(
                    plan.output.as_str(),
                    PathErrorKind::ExceptionRaised,
                    context::OUTPUT,
                )
            })?;
        }

        let archiver = Archiver::locate(self.config.archiver.as_deref())?;
        let job = ArchiveJob {
            working_dir: staging,
            output,
            inputs: files,
            compress: plan.use_compression,
        };
        archiver.run(&job)?;
        info!(output = %output.display(), "archive written");
        Ok(())
    }
}

fn runtime_for(mode: ExecutionMode) -> std::io::Result<Runtime> {
    match mode {
        ExecutionMode::Parallel => Builder::new_multi_thread().enable_all().build(),
        ExecutionMode::Inline | ExecutionMode::Sequential => {
            Builder::new_current_thread().enable_all().build()
        }
    }
}

/// The compiled main class must have been staged (or exist, if absolute).
fn check_main_class(plan: &BuildPlan, staging: &Path) -> Option<DataError> {
    let class_file = plan.main_class.as_ref()?.class_file(staging);
    if class_file.exists() {
        return None;
    }
    debug!(path = %class_file.display(), "main class not found");
    Some(DataError::path(
        class_file.display().to_string(),
        PathErrorKind::NonExistent,
        context::MAIN_CLASS,
    ))
}
