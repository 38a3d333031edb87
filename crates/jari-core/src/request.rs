//! Raw, unvalidated build parameters.

/// A build request exactly as the user wrote it.
///
/// Produced by the DSL parser or assembled from discrete parameters. Nothing
/// here has been sanitized or checked; see
/// [`BuildSpecification`](crate::specification::BuildSpecification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub inputs: Vec<String>,
    pub output: String,
    pub main_class: String,
    pub version: String,
    pub use_compression: bool,
    /// `(coordinate, version)` pairs, e.g. `("org.example.lib", "2.0")`.
    pub dependencies: Vec<(String, String)>,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: String::new(),
            main_class: String::new(),
            version: String::new(),
            use_compression: true,
            dependencies: Vec::new(),
        }
    }
}

impl BuildRequest {
    /// Assemble a request from discrete parameters.
    pub fn from_params<I, S>(
        inputs: I,
        output: impl Into<String>,
        dependencies: Vec<(String, String)>,
        main_class: impl Into<String>,
        version: impl Into<String>,
        use_compression: bool,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: output.into(),
            main_class: main_class.into(),
            version: version.into(),
            use_compression,
            dependencies,
        }
    }
}
