//! Validated build configuration.
//!
//! A [`BuildSpecification`] is built once from a [`BuildRequest`] and never
//! changes afterwards. All validation happens in the constructor and every
//! failure is kept, so a caller sees the whole list at once. The only way to
//! get something the pipeline can run is [`BuildSpecification::into_plan`],
//! which refuses invalid specifications.

use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::dependency::{Dependency, RemoteArtifact};
use crate::error::{DataError, PathErrorKind, context};
use crate::fs_obj::FsObj;
use crate::request::BuildRequest;
use crate::sanitize::{
    IDENTIFIER_SEPARATOR, sanitize, segments, validate_identifier, validate_path,
    validate_path_shape,
};

/// Version written to the manifest when none is given.
pub const DEFAULT_VERSION: f64 = 1.0;

/// The entry point class, kept in both the form used on disk and the dotted
/// form written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainClass {
    fs_form: String,
    dotted: String,
}

impl MainClass {
    /// Parse a user supplied main class such as `com.example.Main` or
    /// `com/example/Main.class`.
    ///
    /// Returns `Ok(None)` for a blank value. Both forms come from the same
    /// segment list, so they cannot disagree.
    ///
    /// # Errors
    ///
    /// `SingleCharacter`, `SeparatorMissing` or `Empty` (e.g. a bare `class`).
    pub fn parse(raw: &str) -> Result<Option<Self>, DataError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let normalized = sanitize(&raw.replace('.', MAIN_SEPARATOR_STR), MAIN_SEPARATOR);
        let mut parts: Vec<&str> = segments(&normalized, MAIN_SEPARATOR).collect();
        while parts.last() == Some(&"class") {
            parts.pop();
        }

        let joined = parts.join(MAIN_SEPARATOR_STR);
        let fs_form = if normalized.starts_with(MAIN_SEPARATOR) {
            format!("{MAIN_SEPARATOR}{joined}")
        } else {
            joined
        };

        if let Err(kind) = validate_path_shape(&fs_form) {
            return Err(DataError::path(fs_form, kind, context::MAIN_CLASS));
        }

        Ok(Some(Self {
            dotted: parts.join("."),
            fs_form,
        }))
    }

    /// Path form, e.g. `com/example/Main`.
    pub fn fs_form(&self) -> &str {
        &self.fs_form
    }

    /// Manifest form, e.g. `com.example.Main`.
    pub fn dotted(&self) -> &str {
        &self.dotted
    }

    pub fn is_absolute(&self) -> bool {
        Path::new(&self.fs_form).is_absolute()
    }

    /// Where the compiled class must be found once inputs are staged.
    /// Absolute main classes are checked as given.
    pub fn class_file(&self, staging: &Path) -> PathBuf {
        let file = format!("{}.class", self.fs_form);
        if self.is_absolute() {
            PathBuf::from(file)
        } else {
            staging.join(file)
        }
    }
}

#[derive(Debug)]
pub struct BuildSpecification {
    inputs: Option<Vec<FsObj>>,
    output: Option<FsObj>,
    main_class: Option<MainClass>,
    version: f64,
    use_compression: bool,
    dependencies: Vec<Arc<dyn Dependency>>,
    errors: Vec<DataError>,
}

impl BuildSpecification {
    /// Validate `request`, resolving dependencies against `repository`.
    pub fn new(request: &BuildRequest, repository: &str) -> Self {
        let mut errors = Vec::new();

        let inputs = validate_inputs(&request.inputs, &mut errors);
        let output = validate_output(&request.output, &mut errors);
        let main_class = MainClass::parse(&request.main_class).unwrap_or_else(|err| {
            errors.push(err);
            None
        });
        let version = parse_version(&request.version, &mut errors);
        let mut dependencies = validate_dependencies(&request.dependencies, repository, &mut errors);

        if errors.is_empty() {
            Self {
                inputs,
                output,
                main_class,
                version,
                use_compression: request.use_compression,
                dependencies,
                errors,
            }
        } else {
            dependencies.clear();
            Self {
                inputs: None,
                output: None,
                main_class: None,
                version,
                use_compression: request.use_compression,
                dependencies,
                errors,
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[DataError] {
        &self.errors
    }

    /// Resolved inputs; empty when the specification is invalid.
    pub fn inputs(&self) -> &[FsObj] {
        self.inputs.as_deref().unwrap_or_default()
    }

    pub fn output(&self) -> Option<&FsObj> {
        self.output.as_ref()
    }

    pub fn main_class(&self) -> Option<&MainClass> {
        self.main_class.as_ref()
    }

    pub fn version(&self) -> f64 {
        self.version
    }

    pub fn use_compression(&self) -> bool {
        self.use_compression
    }

    pub fn dependencies(&self) -> &[Arc<dyn Dependency>] {
        &self.dependencies
    }

    /// Turn a valid specification into a runnable plan.
    ///
    /// # Errors
    ///
    /// Returns the validation errors when the specification is invalid.
    pub fn into_plan(self) -> Result<BuildPlan, Vec<DataError>> {
        match (self.inputs, self.output) {
            (Some(inputs), Some(output)) if self.errors.is_empty() => Ok(BuildPlan {
                inputs,
                output,
                main_class: self.main_class,
                version: self.version,
                use_compression: self.use_compression,
                dependencies: self.dependencies,
            }),
            _ => Err(self.errors),
        }
    }
}

/// Everything a build needs, with no optional pieces left to check.
#[derive(Debug)]
pub struct BuildPlan {
    pub inputs: Vec<FsObj>,
    pub output: FsObj,
    pub main_class: Option<MainClass>,
    pub version: f64,
    pub use_compression: bool,
    pub dependencies: Vec<Arc<dyn Dependency>>,
}

fn validate_inputs(raw: &[String], errors: &mut Vec<DataError>) -> Option<Vec<FsObj>> {
    let before = errors.len();
    let mut resolved = Vec::with_capacity(raw.len());

    for input in raw {
        let normalized = sanitize(input, MAIN_SEPARATOR);
        if let Err(kind) = validate_path(&normalized) {
            errors.push(DataError::path(input.as_str(), kind, context::INPUT));
            continue;
        }
        match FsObj::new(normalized) {
            Ok(obj) => resolved.push(obj),
            Err(_) => errors.push(DataError::path(
                input.as_str(),
                PathErrorKind::ExceptionRaised,
                context::INPUT,
            )),
        }
    }

    (errors.len() == before).then_some(resolved)
}

fn validate_output(raw: &str, errors: &mut Vec<DataError>) -> Option<FsObj> {
    let normalized = sanitize(raw, MAIN_SEPARATOR);
    match validate_path(&normalized) {
        Ok(()) | Err(PathErrorKind::NonExistent) => {}
        Err(kind) => {
            errors.push(DataError::path(normalized, kind, context::OUTPUT));
            return None;
        }
    }

    FsObj::new(normalized)
        .map_err(|_| {
            errors.push(DataError::path(
                raw,
                PathErrorKind::ExceptionRaised,
                context::OUTPUT,
            ));
        })
        .ok()
}

fn parse_version(raw: &str, errors: &mut Vec<DataError>) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_VERSION;
    }
    match trimmed.parse::<f64>() {
        Ok(version) if version.is_finite() => version,
        _ => {
            errors.push(DataError::NotANumber {
                value: raw.to_string(),
                field: context::VERSION,
            });
            DEFAULT_VERSION
        }
    }
}

fn validate_dependencies(
    raw: &[(String, String)],
    repository: &str,
    errors: &mut Vec<DataError>,
) -> Vec<Arc<dyn Dependency>> {
    let mut resolved: Vec<Arc<dyn Dependency>> = Vec::with_capacity(raw.len());

    for (coordinate, version) in raw {
        let normalized = sanitize(coordinate, IDENTIFIER_SEPARATOR);
        let version_trimmed = version.trim();
        let mut ok = true;

        if let Err(kind) = validate_identifier(&normalized) {
            errors.push(DataError::path(coordinate.as_str(), kind, context::DEPENDENCY));
            ok = false;
        }
        if let Err(kind) = validate_identifier(version_trimmed) {
            errors.push(DataError::path(
                version.as_str(),
                kind,
                context::DEPENDENCY_VERSION,
            ));
            ok = false;
        }

        if !ok {
            continue;
        }
        let Some(artifact) =
            RemoteArtifact::from_coordinate(&normalized, version_trimmed, repository)
        else {
            continue;
        };
        // the same jar twice would collide in staging and in the archive
        let coordinate = artifact.coordinate();
        if resolved.iter().any(|dep| dep.coordinate() == coordinate) {
            debug!(%coordinate, "duplicate dependency ignored");
            continue;
        }
        resolved.push(Arc::new(artifact));
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DEFAULT_REPOSITORY;
    use crate::dsl::parse_str;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn mkdir(&self, name: &str) -> String {
            let path = self.dir.path().join(name);
            std::fs::create_dir_all(&path).unwrap();
            path.to_string_lossy().to_string()
        }

        fn missing(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().to_string()
        }
    }

    fn request(inputs: Vec<String>, output: String) -> BuildRequest {
        BuildRequest {
            inputs,
            output,
            ..BuildRequest::default()
        }
    }

    #[test]
    fn test_valid_request() {
        let fx = Fixture::new();
        let a = fx.mkdir("a");
        let b = fx.mkdir("b");
        let text = format!("input {{ \"{a}\" \"{b}\" }} output \"{}\"", fx.missing("out.jar"));
        let spec = BuildSpecification::new(&parse_str(&text).unwrap(), DEFAULT_REPOSITORY);

        assert!(spec.is_valid(), "{:?}", spec.errors());
        assert_eq!(spec.inputs().len(), 2);
        assert_eq!(spec.inputs()[0].file_name(), Some("a"));
        assert!(spec.output().is_some());
        assert!(spec.main_class().is_none());
        assert!((spec.version() - DEFAULT_VERSION).abs() < f64::EPSILON);
        assert!(spec.use_compression());
    }

    #[test]
    fn test_missing_input_reports_exactly_one_error() {
        let fx = Fixture::new();
        let a = fx.missing("a");
        let b = fx.mkdir("b");
        let spec =
            BuildSpecification::new(&request(vec![a.clone(), b], fx.missing("out.jar")), DEFAULT_REPOSITORY);

        assert!(!spec.is_valid());
        assert_eq!(
            spec.errors(),
            [DataError::path(a, PathErrorKind::NonExistent, context::INPUT)]
        );
        assert!(spec.inputs().is_empty());
        assert!(spec.output().is_none());
    }

    #[test]
    fn test_every_bad_input_is_reported() {
        let fx = Fixture::new();
        let spec = BuildSpecification::new(
            &request(
                vec!["x".into(), fx.missing("gone"), "nosep".into()],
                fx.missing("out.jar"),
            ),
            DEFAULT_REPOSITORY,
        );
        let kinds: Vec<_> = spec.errors().iter().filter_map(DataError::path_kind).collect();
        assert_eq!(
            kinds,
            [
                PathErrorKind::SingleCharacter,
                PathErrorKind::NonExistent,
                PathErrorKind::SeparatorMissing
            ]
        );
    }

    #[test]
    fn test_output_rules() {
        let fx = Fixture::new();
        let input = fx.mkdir("classes");

        // output does not need to exist yet
        let ok = BuildSpecification::new(
            &request(vec![input.clone()], fx.missing("build/app.jar")),
            DEFAULT_REPOSITORY,
        );
        assert!(ok.is_valid());

        for (output, kind) in [
            ("", PathErrorKind::Empty),
            ("o", PathErrorKind::SingleCharacter),
            ("app.jar", PathErrorKind::SeparatorMissing),
        ] {
            let spec =
                BuildSpecification::new(&request(vec![input.clone()], output.into()), DEFAULT_REPOSITORY);
            assert_eq!(spec.errors().len(), 1, "output {output:?}");
            assert_eq!(spec.errors()[0].path_kind(), Some(kind));
        }
    }

    #[test]
    fn test_version_parsing() {
        let fx = Fixture::new();
        let mut req = request(vec![fx.mkdir("c")], fx.missing("out.jar"));

        req.version = "  ".into();
        let blank = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!(blank.is_valid());
        assert!((blank.version() - 1.0).abs() < f64::EPSILON);

        req.version = "1.25".into();
        let given = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!((given.version() - 1.25).abs() < f64::EPSILON);

        req.version = "abc".into();
        let bad = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!(!bad.is_valid());
        assert_eq!(
            bad.errors(),
            [DataError::NotANumber {
                value: "abc".into(),
                field: context::VERSION
            }]
        );
    }

    #[test]
    fn test_main_class_forms() {
        let main = MainClass::parse("com.example.Main").unwrap().unwrap();
        let sep = MAIN_SEPARATOR;
        assert_eq!(main.fs_form(), format!("com{sep}example{sep}Main"));
        assert_eq!(main.dotted(), "com.example.Main");
        assert!(!main.is_absolute());
        assert_eq!(
            main.class_file(Path::new("/stage")),
            Path::new("/stage").join(format!("com{sep}example{sep}Main.class"))
        );

        let with_suffix = MainClass::parse(" com.example.Main.class ").unwrap().unwrap();
        assert_eq!(with_suffix, main);
    }

    #[test]
    fn test_main_class_rules() {
        assert_eq!(MainClass::parse("   "), Ok(None));
        assert_eq!(
            MainClass::parse("Main").unwrap_err().path_kind(),
            Some(PathErrorKind::SeparatorMissing)
        );
        assert_eq!(
            MainClass::parse("M").unwrap_err().path_kind(),
            Some(PathErrorKind::SingleCharacter)
        );
        assert_eq!(
            MainClass::parse("class").unwrap_err().path_kind(),
            Some(PathErrorKind::Empty)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_main_class_is_checked_as_given() {
        let main = MainClass::parse("/opt/app/Main").unwrap().unwrap();
        assert!(main.is_absolute());
        assert_eq!(main.class_file(Path::new("/stage")), Path::new("/opt/app/Main.class"));
    }

    #[test]
    fn test_dependencies_validated() {
        let fx = Fixture::new();
        let mut req = request(vec![fx.mkdir("c")], fx.missing("out.jar"));
        req.dependencies = vec![
            ("org..example.lib.".into(), "2.0".into()),
            ("lib".into(), "2".into()),
        ];

        let spec = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!(!spec.is_valid());
        assert_eq!(
            spec.errors(),
            [
                DataError::path("lib", PathErrorKind::SeparatorMissing, context::DEPENDENCY),
                DataError::path(
                    "2",
                    PathErrorKind::SingleCharacter,
                    context::DEPENDENCY_VERSION
                ),
            ]
        );
        assert!(spec.dependencies().is_empty());

        req.dependencies.truncate(1);
        let spec = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!(spec.is_valid());
        assert_eq!(spec.dependencies()[0].coordinate(), "org.example:lib:2.0");
    }

    #[test]
    fn test_repeated_dependency_is_kept_once() {
        let fx = Fixture::new();
        let mut req = request(vec![fx.mkdir("c")], fx.missing("out.jar"));
        req.dependencies = vec![
            ("org.example.lib".into(), "1.0".into()),
            ("org.example.lib".into(), "2.0".into()),
            (" org..example.lib ".into(), "1.0".into()),
        ];

        let spec = BuildSpecification::new(&req, DEFAULT_REPOSITORY);
        assert!(spec.is_valid());
        let coordinates: Vec<String> = spec.dependencies().iter().map(|d| d.coordinate()).collect();
        assert_eq!(coordinates, ["org.example:lib:1.0", "org.example:lib:2.0"]);
    }

    #[test]
    fn test_into_plan() {
        let fx = Fixture::new();
        let mut req = request(vec![fx.mkdir("c")], fx.missing("out.jar"));
        req.main_class = "com.example.Main".into();
        req.use_compression = false;

        let plan = BuildSpecification::new(&req, DEFAULT_REPOSITORY)
            .into_plan()
            .unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert!(!plan.use_compression);
        assert_eq!(plan.main_class.unwrap().dotted(), "com.example.Main");

        req.version = "x1".into();
        let errors = BuildSpecification::new(&req, DEFAULT_REPOSITORY)
            .into_plan()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
