//! Plain-text progress on stderr.

use std::io::Write;

use jari_core::{JobPhase, Reporter};

/// Prints one line per event to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    fn line(args: std::fmt::Arguments<'_>) {
        // progress is best effort; a closed stderr must not fail the build
        let _ = writeln!(std::io::stderr().lock(), "{args}");
    }
}

impl Reporter for ConsoleReporter {
    fn phase(&self, phase: JobPhase) {
        if phase != JobPhase::Idle {
            Self::line(format_args!("==> {phase}"));
        }
    }

    fn input_staged(&self, name: &str) {
        Self::line(format_args!("    staged {name}"));
    }

    fn dependency_fetched(&self, file_name: &str, size: u64) {
        Self::line(format_args!("    fetched {file_name} ({size} bytes)"));
    }

    fn dependency_failed(&self, coordinate: &str, reason: &str) {
        Self::line(format_args!("    failed {coordinate}: {reason}"));
    }

    fn warning(&self, msg: &str) {
        Self::line(format_args!("warning: {msg}"));
    }
}
