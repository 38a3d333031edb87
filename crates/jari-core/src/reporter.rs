//! Reporter trait for dependency injection
//!
//! Lets the build pipeline report progress without being coupled to a
//! particular front-end. Callers that only poll the job state can use
//! [`NullReporter`].

use crate::backend::JobPhase;

pub trait Reporter: Send + Sync {
    /// The job moved to a new phase.
    fn phase(&self, phase: JobPhase);

    /// An input directory or file was copied into the staging area.
    fn input_staged(&self, name: &str);

    /// A dependency finished downloading into the staging area.
    fn dependency_fetched(&self, file_name: &str, size: u64);

    /// A dependency could not be downloaded.
    fn dependency_failed(&self, coordinate: &str, reason: &str);

    /// Something went wrong that does not affect the build result.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn phase(&self, phase: JobPhase) {
        (**self).phase(phase);
    }
    fn input_staged(&self, name: &str) {
        (**self).input_staged(name);
    }
    fn dependency_fetched(&self, file_name: &str, size: u64) {
        (**self).dependency_fetched(file_name, size);
    }
    fn dependency_failed(&self, coordinate: &str, reason: &str) {
        (**self).dependency_failed(coordinate, reason);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn phase(&self, _: JobPhase) {}
    fn input_staged(&self, _: &str) {}
    fn dependency_fetched(&self, _: &str, _: u64) {}
    fn dependency_failed(&self, _: &str, _: &str) {}
    fn warning(&self, _: &str) {}
}
