//! The manifest handed to the archiver.

use std::io;
use std::path::{Path, PathBuf};

/// Name of the manifest inside the staging directory.
pub const MANIFEST_FILE: &str = "MANIFEST.txt";

/// Format a version so whole numbers keep one fractional digit (`1.0`).
pub fn format_version(version: f64) -> String {
    if version.fract().abs() < f64::EPSILON {
        format!("{version:.1}")
    } else {
        version.to_string()
    }
}

/// Manifest text: the version line, then the main class line if any.
pub fn render(version: f64, main_class: Option<&str>) -> String {
    let mut out = format!("Manifest-Version: {}\n", format_version(version));
    if let Some(main) = main_class {
        out.push_str(&format!("Main-Class: {main}\n"));
    }
    out
}

/// Write [`MANIFEST_FILE`] into `dir` and return its path.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be written.
pub fn write(dir: &Path, version: f64, main_class: Option<&str>) -> io::Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    std::fs::write(&path, render(version, main_class))?;
    Ok(path)
}
