//! Remote library dependencies.
//!
//! A [`Dependency`] knows how to fetch its jar; [`DependencyResolver`] fetches
//! a whole list into a staging directory. Each dependency is resolved on its
//! own: one failure never stops the others, and every failure is returned as
//! a [`DataError::Dependency`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::DataError;
use crate::reporter::Reporter;
use crate::sanitize::{IDENTIFIER_SEPARATOR, segments};

/// Maven Central, the default repository.
pub const DEFAULT_REPOSITORY: &str = "https://repo1.maven.org/maven2";

#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte stream of a dependency's archive.
pub type ArtifactStream = BoxStream<'static, Result<Bytes, DependencyError>>;

/// Something that can produce a jar to bundle into the build.
#[async_trait]
pub trait Dependency: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Identifier used in error messages, e.g. `org.example:lib:2.0`.
    fn coordinate(&self) -> String;

    /// File name inside the staging directory and the archive.
    fn file_name(&self) -> String {
        format!("{}-{}.jar", self.name(), self.version())
    }

    /// Fetch the whole archive into memory.
    async fn fetch_bytes(&self, client: &Client) -> Result<Bytes, DependencyError>;

    /// Open the archive as a stream of chunks.
    async fn open_stream(&self, client: &Client) -> Result<ArtifactStream, DependencyError>;
}

/// A jar published to a Maven layout repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    group: Vec<String>,
    name: String,
    version: String,
    repository: String,
}

impl RemoteArtifact {
    pub fn new(
        group: Vec<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        repository: &str,
    ) -> Self {
        Self {
            group,
            name: name.into(),
            version: version.into(),
            repository: repository.trim_end_matches('/').to_string(),
        }
    }

    /// Build from a sanitized dotted coordinate: every segment but the last
    /// is the group, the last is the artifact name.
    ///
    /// Returns `None` when the coordinate has no segments.
    pub fn from_coordinate(coordinate: &str, version: &str, repository: &str) -> Option<Self> {
        let mut parts: Vec<String> = segments(coordinate, IDENTIFIER_SEPARATOR)
            .map(str::to_string)
            .collect();
        let name = parts.pop()?;
        Some(Self::new(parts, name, version, repository))
    }

    pub fn group(&self) -> &[String] {
        &self.group
    }

    /// `<repository>/<group...>/<name>/<version>/<name>-<version>.jar`
    pub fn url(&self) -> String {
        let mut url = self.repository.clone();
        for part in self.group.iter().chain([&self.name, &self.version]) {
            url.push('/');
            url.push_str(part);
        }
        url.push('/');
        url.push_str(&self.file_name());
        url
    }

    async fn get(&self, client: &Client) -> Result<reqwest::Response, DependencyError> {
        let url = self.url();
        debug!(%url, "requesting dependency");
        let response = client
            .get(&url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }
}

#[async_trait]
impl Dependency for RemoteArtifact {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.group.join("."), self.name, self.version)
    }

    async fn fetch_bytes(&self, client: &Client) -> Result<Bytes, DependencyError> {
        Ok(self.get(client).await?.bytes().await?)
    }

    async fn open_stream(&self, client: &Client) -> Result<ArtifactStream, DependencyError> {
        let response = self.get(client).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DependencyError::from))
            .boxed())
    }
}

/// Outcome of resolving a list of dependencies.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Staged file names in the order their downloads finished.
    pub file_names: Vec<String>,
    pub errors: Vec<DataError>,
}

impl Resolution {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Downloads dependencies into a directory.
pub struct DependencyResolver<'a> {
    client: Client,
    reporter: &'a dyn Reporter,
}

impl fmt::Debug for DependencyResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyResolver").finish_non_exhaustive()
    }
}

impl<'a> DependencyResolver<'a> {
    pub fn new(client: Client, reporter: &'a dyn Reporter) -> Self {
        Self { client, reporter }
    }

    /// Download every dependency into `dest`, at most `concurrency` at a time.
    pub async fn resolve_all(
        &self,
        dependencies: &[Arc<dyn Dependency>],
        dest: &Path,
        concurrency: usize,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let mut downloads = stream::iter(dependencies)
            .map(|dep| self.resolve_one(&**dep, dest))
            .buffer_unordered(concurrency.max(1));

        while let Some(result) = downloads.next().await {
            match result {
                Ok(file_name) => resolution.file_names.push(file_name),
                Err(err) => resolution.errors.push(err),
            }
        }

        resolution
    }

    async fn resolve_one(&self, dep: &dyn Dependency, dest: &Path) -> Result<String, DataError> {
        let file_name = dep.file_name();
        let target = dest.join(&file_name);

        match download_to(dep, &self.client, &target).await {
            Ok(size) => {
                debug!(file = %file_name, size, "dependency staged");
                self.reporter.dependency_fetched(&file_name, size);
                Ok(file_name)
            }
            Err(err) => {
                let coordinate = dep.coordinate();
                warn!(%coordinate, error = %err, "dependency download failed");
                tokio::fs::remove_file(&target).await.ok();
                self.reporter.dependency_failed(&coordinate, &err.to_string());
                Err(DataError::Dependency {
                    coordinate,
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Stream a dependency into `target`, returning the number of bytes written.
async fn download_to(
    dep: &dyn Dependency,
    client: &Client,
    target: &Path,
) -> Result<u64, DependencyError> {
    let mut stream = dep.open_stream(client).await?;
    let mut file = File::create(target).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
