//! HTTP artifact store client.
//!
//! Talks to an artifact service exposing:
//!
//! ```text
//! GET  {base}/artifacts/{name}/{latest|vN}              -> manifest JSON
//! GET  {base}/artifacts/{name}/v{N}/files/{file}        -> raw bytes
//! POST {base}/artifacts/{name}/versions                 -> manifest JSON of the new version
//! PUT  {base}/artifacts/{name}/v{N}/files/{file}        <- raw bytes
//! POST {base}/runs                                      <- run record JSON
//! ```
//!
//! Fetched files are downloaded to `<download_dir>/<name>/v<N>/files/` and
//! reused on later fetches of the same version. A manifest must match the
//! requested reference and list bare file names only, otherwise the fetch
//! fails before anything is written.

use super::{
    Artifact, ArtifactManifest, ArtifactRef, ArtifactStore, ArtifactVersion, FetchedArtifact,
};
use crate::error::{CleaningError, Result, ResultExt};
use crate::run::RunRecord;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for store requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default directory for downloaded artifact files.
const DEFAULT_DOWNLOAD_DIR: &str = "artifacts";

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    #[serde(rename = "type")]
    artifact_type: &'a str,
    description: &'a str,
    files: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
}

/// Configuration for the HTTP store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the artifact service.
    pub base_url: String,
    /// Bearer token sent with every request, if set.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Where fetched files are downloaded.
    pub download_dir: PathBuf,
}

impl HttpStoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HttpStoreConfigBuilder {
        HttpStoreConfigBuilder::default()
    }
}

/// Builder for [`HttpStoreConfig`].
#[derive(Default)]
pub struct HttpStoreConfigBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    download_dir: Option<PathBuf>,
}

impl HttpStoreConfigBuilder {
    /// Set the base URL of the artifact service.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set the directory fetched files are downloaded to.
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HttpStoreConfig {
        HttpStoreConfig {
            base_url: self.base_url.unwrap_or_default(),
            api_key: self.api_key.filter(|k| !k.is_empty()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            download_dir: self
                .download_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
        }
    }
}

/// Artifact store backed by a remote HTTP service.
pub struct HttpArtifactStore {
    config: HttpStoreConfig,
    base_url: Url,
    client: Client,
}

impl HttpArtifactStore {
    /// Create a client for the service at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(HttpStoreConfig::builder().base_url(base_url).build())
    }

    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be created.
    pub fn with_config(config: HttpStoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CleaningError::InvalidConfig(format!(
                "Invalid artifact store URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CleaningError::InvalidConfig(format!(
                "Artifact store URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn download_dir(&self, version: &ArtifactVersion) -> PathBuf {
        self.config
            .download_dir
            .join(&version.name)
            .join(format!("v{}", version.version))
            .join("files")
    }

    fn download_file(&self, manifest: &ArtifactManifest, file: &str, target: &Path) -> Result<()> {
        let version = format!("v{}", manifest.version);
        let url = self.endpoint(&["artifacts", &manifest.name, &version, "files", file]);
        let response = check_status(self.authorize(self.client.get(url)).send()?)?;
        let bytes = response.bytes()?;

        // A download only becomes visible under its final name once complete
        let partial = target.with_file_name(format!(".{}.download", file));
        fs::write(&partial, &bytes).context(format!("Writing {}", partial.display()))?;
        fs::rename(&partial, target).context(format!("Moving {}", target.display()))?;
        debug!("Downloaded {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

impl ArtifactStore for HttpArtifactStore {
    fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact> {
        let version = reference.version.to_string();
        let url = self.endpoint(&["artifacts", &reference.name, &version]);
        let response = self.authorize(self.client.get(url)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(reference.not_found());
        }
        let manifest: ArtifactManifest = check_status(response)?.json()?;
        manifest.verify(reference)?;

        let dir = self.download_dir(&manifest.artifact_version());
        fs::create_dir_all(&dir)?;
        for file in &manifest.files {
            let target = dir.join(file);
            if target.is_file() {
                debug!("Reusing downloaded {}", target.display());
                continue;
            }
            self.download_file(&manifest, file, &target)?;
        }

        Ok(FetchedArtifact { manifest, dir })
    }

    fn publish(&self, artifact: &Artifact, run_id: Option<&str>) -> Result<ArtifactVersion> {
        let files = artifact.file_names()?;
        let request = PublishRequest {
            artifact_type: &artifact.artifact_type,
            description: &artifact.description,
            files: &files,
            run_id,
        };

        let url = self.endpoint(&["artifacts", &artifact.name, "versions"]);
        let manifest: ArtifactManifest =
            check_status(self.authorize(self.client.post(url)).json(&request).send()?)?.json()?;

        let version = format!("v{}", manifest.version);
        for (path, file) in artifact.files().iter().zip(&files) {
            let body = fs::read(path).context(format!("Reading {}", path.display()))?;
            let url = self.endpoint(&["artifacts", &artifact.name, &version, "files", file]);
            check_status(self.authorize(self.client.put(url)).body(body).send()?)?;
        }

        let published = manifest.artifact_version();
        info!("Published {} to {}", published, self.base_url);
        Ok(published)
    }

    fn record_run(&self, run: &RunRecord) -> Result<()> {
        let url = self.endpoint(&["runs"]);
        check_status(self.authorize(self.client.post(url)).json(run).send()?)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().unwrap_or_default();
    Err(CleaningError::ArtifactStore(format!(
        "{} returned {}: {}",
        url, status, body
    )))
}
