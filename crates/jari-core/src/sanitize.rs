//! Normalization and classification of user supplied paths and dotted
//! identifiers.
//!
//! Both kinds of value go through the same two steps: [`sanitize`] produces
//! the canonical string, then a validator classifies it. Paths use the
//! platform separator and are checked against the disk; identifiers
//! (dependency coordinates and versions) use `.` and are not.

use std::path::{MAIN_SEPARATOR, Path};

use crate::error::PathErrorKind;

/// Separator used by dotted identifiers such as `org.example.lib`.
pub const IDENTIFIER_SEPARATOR: char = '.';

/// Trim whitespace, collapse repeated separators and drop trailing ones.
///
/// A leading separator is kept so absolute paths stay absolute.
///
/// ```
/// use jari_core::sanitize::sanitize;
///
/// assert_eq!(sanitize("  a//b/c/// ", '/'), "a/b/c");
/// assert_eq!(sanitize("/srv//app/", '/'), "/srv/app");
/// assert_eq!(sanitize("org..example.", '.'), "org.example");
/// ```
pub fn sanitize(raw: &str, separator: char) -> String {
    let trimmed = raw.trim();
    let mut buf = [0; 4];
    let joined = segments(trimmed, separator)
        .collect::<Vec<_>>()
        .join(&*separator.encode_utf8(&mut buf));

    if trimmed.starts_with(separator) {
        format!("{separator}{joined}")
    } else {
        joined
    }
}

/// Non-empty segments of `value` split on `separator`.
pub fn segments(value: &str, separator: char) -> impl Iterator<Item = &str> {
    value.split(separator).filter(|s| !s.is_empty())
}

/// Shape checks shared by paths and identifiers, in priority order.
fn classify(value: &str, separator: char) -> Result<(), PathErrorKind> {
    if value.chars().count() == 1 {
        Err(PathErrorKind::SingleCharacter)
    } else if value.trim().is_empty() {
        Err(PathErrorKind::Empty)
    } else if !value.contains(separator) {
        Err(PathErrorKind::SeparatorMissing)
    } else {
        Ok(())
    }
}

/// Classify a sanitized filesystem path.
///
/// # Errors
///
/// Returns the first failing rule: `SingleCharacter`, `Empty`,
/// `SeparatorMissing`, then `NonExistent`.
pub fn validate_path(path: &str) -> Result<(), PathErrorKind> {
    classify(path, MAIN_SEPARATOR)?;
    if Path::new(path).exists() {
        Ok(())
    } else {
        Err(PathErrorKind::NonExistent)
    }
}

/// Classify the shape of a path without touching the disk.
///
/// # Errors
///
/// Same rules as [`validate_path`] minus the existence check.
pub fn validate_path_shape(path: &str) -> Result<(), PathErrorKind> {
    classify(path, MAIN_SEPARATOR)
}

/// Classify a dotted identifier such as a coordinate or a version.
///
/// # Errors
///
/// `SingleCharacter`, `Empty` or `SeparatorMissing`.
pub fn validate_identifier(identifier: &str) -> Result<(), PathErrorKind> {
    classify(identifier, IDENTIFIER_SEPARATOR)
}
