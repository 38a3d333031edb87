#![allow(missing_docs)]

//! Core of jari: turns a build configuration into a jar.
//!
//! The usual entry point is [`Backend`]: submit a [`BuildRequest`] or DSL
//! text, then poll for the result.

pub mod archiver;
pub mod backend;
pub mod config;
pub mod dependency;
pub mod dsl;
pub mod error;
pub mod fs_obj;
pub mod manifest;
pub mod request;
pub mod sanitize;
pub mod specification;
pub mod staging;

pub mod reporter;

pub use backend::{Backend, JobPhase, JobSnapshot, SubmitError, SubmitOutcome};
pub use config::{BackendConfig, ExecutionMode};
pub use error::{DataError, PathErrorKind};
pub use reporter::{NullReporter, Reporter};
pub use request::BuildRequest;
pub use specification::{BuildPlan, BuildSpecification, MainClass};

/// User Agent string sent to dependency repositories
pub const USER_AGENT: &str = concat!("jari-core/", env!("CARGO_PKG_VERSION"));
