//! Shared job state and the single-flight token.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::{DataError, PathErrorKind, context};

/// Where the current build is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Validating,
    /// Inputs are copied and dependencies downloaded.
    Staging,
    ManifestWriting,
    Archiving,
    Cleanup,
}

impl JobPhase {
    const ALL: [Self; 6] = [
        Self::Idle,
        Self::Validating,
        Self::Staging,
        Self::ManifestWriting,
        Self::Archiving,
        Self::Cleanup,
    ];

    fn from_u8(raw: u8) -> Self {
        Self::ALL.get(usize::from(raw)).copied().unwrap_or(Self::Idle)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Staging => "staging",
            Self::ManifestWriting => "writing manifest",
            Self::Archiving => "archiving",
            Self::Cleanup => "cleaning up",
        };
        f.write_str(name)
    }
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// State of the one build a backend may run at a time.
///
/// `running` and `done` are two views of a single atomic status, so they can
/// never be observed true together.
#[derive(Debug)]
pub(crate) struct JobState {
    status: AtomicU8,
    ok: AtomicBool,
    phase: AtomicU8,
    errors: Mutex<Vec<DataError>>,
}

impl JobState {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(IDLE),
            ok: AtomicBool::new(false),
            phase: AtomicU8::new(JobPhase::Idle as u8),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Claim the job slot. Returns `None` if a build is already running.
    pub(crate) fn try_begin(self: &Arc<Self>) -> Option<RunToken> {
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != RUNNING).then_some(RUNNING)
            })
            .ok()?;

        // fresh list for the new job; nothing from the previous one leaks in
        *self.lock_errors() = Vec::new();
        self.ok.store(false, Ordering::Release);
        self.set_phase(JobPhase::Validating);
        Some(RunToken {
            state: Arc::clone(self),
            finished: false,
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.status.load(Ordering::Acquire) == RUNNING
    }

    pub(crate) fn is_done(&self) -> bool {
        self.status.load(Ordering::Acquire) == DONE
    }

    pub(crate) fn is_ok(&self) -> bool {
        self.ok.load(Ordering::Acquire)
    }

    pub(crate) fn phase(&self) -> JobPhase {
        JobPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: JobPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub(crate) fn take_errors(&self) -> Vec<DataError> {
        std::mem::take(&mut *self.lock_errors())
    }

    pub(crate) fn error_count(&self) -> usize {
        self.lock_errors().len()
    }

    /// Forget the last result. Only valid while idle.
    pub(crate) fn clear(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.lock_errors().clear();
        self.ok.store(false, Ordering::Release);
        // a build may have started between the check and here; leave it alone
        let _ = self
            .status
            .compare_exchange(DONE, IDLE, Ordering::AcqRel, Ordering::Acquire);
        true
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            running: self.is_running(),
            done: self.is_done(),
            ok: self.is_ok(),
            phase: self.phase(),
            error_count: self.error_count(),
        }
    }

    fn lock_errors(&self) -> MutexGuard<'_, Vec<DataError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the caller owns the running job.
///
/// Dropping it without [`finish`](Self::finish) (a panic in the worker)
/// still releases the slot and records the build as failed.
pub(crate) struct RunToken {
    state: Arc<JobState>,
    finished: bool,
}

impl fmt::Debug for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunToken")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl RunToken {
    pub(crate) fn state(&self) -> &JobState {
        &self.state
    }

    /// Publish the outcome and release the slot.
    pub(crate) fn finish(mut self, errors: Vec<DataError>) {
        self.publish(errors);
    }

    fn publish(&mut self, errors: Vec<DataError>) {
        self.finished = true;
        let ok = errors.is_empty();
        *self.state.lock_errors() = errors;
        self.state.ok.store(ok, Ordering::Release);
        self.state.set_phase(JobPhase::Idle);
        self.state.status.store(DONE, Ordering::Release);
    }
}

impl Drop for RunToken {
    fn drop(&mut self) {
        if !self.finished {
            self.publish(vec![DataError::path(
                "build worker",
                PathErrorKind::ExceptionRaised,
                context::BACKEND,
            )]);
        }
    }
}

/// Point-in-time copy of the job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub running: bool,
    pub done: bool,
    pub ok: bool,
    pub phase: JobPhase,
    pub error_count: usize,
}
