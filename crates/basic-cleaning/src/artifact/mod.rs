//! Artifact store abstraction.
//!
//! Artifacts are immutable, named, typed and versioned blobs. A store hands
//! out local copies of existing versions and accepts new ones; it never
//! mutates a version once published.
//!
//! # Feature Flag
//!
//! The [`ArtifactStore`] trait and the filesystem-backed
//! [`LocalArtifactStore`] are always available. The HTTP client
//! [`HttpArtifactStore`] requires the `remote` feature (enabled by default).
//!
//! # References
//!
//! Artifacts are referenced as `name`, `name:latest` or `name:vN`. A bare
//! name resolves to the latest version.
//!
//! ```rust,ignore
//! use basic_cleaning::artifact::{ArtifactRef, ArtifactStore, LocalArtifactStore};
//!
//! let store = LocalArtifactStore::new("artifact-store");
//! let fetched = store.fetch(&"sample.csv:latest".parse()?)?;
//! println!("{}", fetched.file()?.display());
//! ```

mod local;
#[cfg(feature = "remote")]
mod remote;

pub use local::LocalArtifactStore;
#[cfg(feature = "remote")]
pub use remote::{HttpArtifactStore, HttpStoreConfig, HttpStoreConfigBuilder};

use crate::error::{CleaningError, Result};
use crate::run::RunRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

// name[:latest|:vN] - compiled once at startup
static REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)(?::(?P<version>latest|v\d+))?$")
        .expect("Invalid regex: artifact reference")
});

/// Which version of an artifact a reference points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionSpec {
    /// Highest published version.
    Latest,
    /// An exact version number.
    Version(u32),
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Version(v) => write!(f, "v{}", v),
        }
    }
}

/// Parsed artifact reference (`name`, `name:latest` or `name:vN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSpec,
}

impl ArtifactRef {
    /// Error returned when this reference cannot be resolved.
    pub fn not_found(&self) -> CleaningError {
        CleaningError::ArtifactNotFound {
            name: self.name.clone(),
            version: self.version.to_string(),
        }
    }
}

impl FromStr for ArtifactRef {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = REFERENCE_PATTERN
            .captures(s.trim())
            .ok_or_else(|| CleaningError::InvalidArtifactName(s.to_string()))?;

        let name = caps["name"].to_string();
        let version = match caps.name("version").map(|m| m.as_str()) {
            None | Some("latest") => VersionSpec::Latest,
            Some(v) => VersionSpec::Version(
                v[1..]
                    .parse()
                    .map_err(|_| CleaningError::InvalidArtifactName(s.to_string()))?,
            ),
        };

        Ok(Self { name, version })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// A concrete, resolved artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

/// Metadata stored with every published version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    /// File names, relative to the version's file directory.
    pub files: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Run that published this version, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl ArtifactManifest {
    pub fn artifact_version(&self) -> ArtifactVersion {
        ArtifactVersion {
            name: self.name.clone(),
            version: self.version,
        }
    }

    /// Check that this manifest answers `reference` and that every file
    /// entry is a bare file name.
    ///
    /// Manifests from a store are untrusted: a mismatched name or a file
    /// entry such as `../x` would place files outside the version directory.
    pub fn verify(&self, reference: &ArtifactRef) -> Result<()> {
        if self.name != reference.name {
            return Err(CleaningError::ArtifactStore(format!(
                "Store answered {} with a manifest for '{}'",
                reference, self.name
            )));
        }
        if let VersionSpec::Version(v) = reference.version
            && v != self.version
        {
            return Err(CleaningError::ArtifactStore(format!(
                "Store answered {} with version v{}",
                reference, self.version
            )));
        }
        for file in &self.files {
            validate_file_name(file)?;
        }
        Ok(())
    }
}

/// A new artifact being assembled for publishing.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    files: Vec<PathBuf>,
}

impl Artifact {
    /// Create an empty artifact. The name must be a valid artifact name.
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            artifact_type: artifact_type.into(),
            description: description.into(),
            files: Vec::new(),
        })
    }

    /// Attach a local file. Files are stored under their file name, which
    /// must be unique within the artifact.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CleaningError::ArtifactStore(format!(
                "Cannot add '{}' to artifact '{}': not a file",
                path.display(),
                self.name
            )));
        }

        let file_name = file_name_of(path)?;
        if self.file_names()?.contains(&file_name) {
            return Err(CleaningError::ArtifactStore(format!(
                "Artifact '{}' already contains a file named '{}'",
                self.name, file_name
            )));
        }

        self.files.push(path.to_path_buf());
        Ok(())
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Stored file names, in the order files were added.
    pub fn file_names(&self) -> Result<Vec<String>> {
        self.files.iter().map(|p| file_name_of(p)).collect()
    }
}

/// A fetched artifact version with its files available locally.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub manifest: ArtifactManifest,
    /// Directory holding the artifact's files.
    pub dir: PathBuf,
}

impl FetchedArtifact {
    pub fn version(&self) -> ArtifactVersion {
        self.manifest.artifact_version()
    }

    /// Local path of the artifact's only file.
    ///
    /// Fails when the artifact holds zero or several files.
    pub fn file(&self) -> Result<PathBuf> {
        match self.manifest.files.as_slice() {
            [only] => {
                validate_file_name(only)?;
                Ok(self.dir.join(only))
            }
            files => Err(CleaningError::ArtifactStore(format!(
                "Artifact '{}' holds {} files, expected exactly one",
                self.version(),
                files.len()
            ))),
        }
    }
}

static_assertions::assert_impl_all!(LocalArtifactStore: ArtifactStore, Send, Sync);
#[cfg(feature = "remote")]
static_assertions::assert_impl_all!(HttpArtifactStore: ArtifactStore, Send, Sync);

/// Trait for stores that version and serve artifacts.
///
/// Implementations must be `Send + Sync` so a store can be shared by
/// reference with the run that uses it.
pub trait ArtifactStore: Send + Sync {
    /// Resolve a reference and make the version's files available locally.
    fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact>;

    /// Publish a new version of `artifact` and return its version.
    ///
    /// Existing versions are never overwritten.
    fn publish(&self, artifact: &Artifact, run_id: Option<&str>) -> Result<ArtifactVersion>;

    /// Persist the provenance record of a run.
    fn record_run(&self, run: &RunRecord) -> Result<()>;

    /// Store name for logging.
    fn name(&self) -> &str;
}

/// Open a store from a location string.
///
/// `http://` and `https://` locations open an [`HttpArtifactStore`]
/// (requires the `remote` feature); anything else is treated as the root
/// directory of a [`LocalArtifactStore`].
pub fn open_store(location: &str, api_key: Option<String>) -> Result<Box<dyn ArtifactStore>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        #[cfg(feature = "remote")]
        {
            let mut builder = HttpStoreConfig::builder().base_url(location);
            if let Some(key) = api_key {
                builder = builder.api_key(key);
            }
            return Ok(Box::new(HttpArtifactStore::with_config(builder.build())?));
        }

        #[cfg(not(feature = "remote"))]
        {
            let _ = api_key;
            return Err(CleaningError::InvalidConfig(format!(
                "Store '{}' needs the 'remote' feature",
                location
            )));
        }
    }

    Ok(Box::new(LocalArtifactStore::new(location)))
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let valid = REFERENCE_PATTERN
        .captures(name)
        .is_some_and(|caps| caps.name("version").is_none());
    if valid {
        Ok(())
    } else {
        Err(CleaningError::InvalidArtifactName(name.to_string()))
    }
}

/// Accept only names that are a single normal path component.
pub(crate) fn validate_file_name(file: &str) -> Result<()> {
    let mut components = Path::new(file).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == file
    );
    if single && !file.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(CleaningError::ArtifactStore(format!(
            "Invalid file name '{}' in artifact manifest",
            file
        )))
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CleaningError::ArtifactStore(format!("'{}' has no usable file name", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name_means_latest() {
        let reference: ArtifactRef = "sample.csv".parse().unwrap();
        assert_eq!(reference.name, "sample.csv");
        assert_eq!(reference.version, VersionSpec::Latest);
    }

    #[test]
    fn test_parse_explicit_versions() {
        let latest: ArtifactRef = "sample.csv:latest".parse().unwrap();
        assert_eq!(latest.version, VersionSpec::Latest);

        let pinned: ArtifactRef = "clean_sample.csv:v12".parse().unwrap();
        assert_eq!(pinned.name, "clean_sample.csv");
        assert_eq!(pinned.version, VersionSpec::Version(12));
        assert_eq!(pinned.to_string(), "clean_sample.csv:v12");
    }

    #[test]
    fn test_parse_rejects_bad_references() {
        for bad in ["", ":v1", "sample.csv:v", "sample.csv:prod", "../etc/passwd", "a b"] {
            assert!(
                matches!(
                    bad.parse::<ArtifactRef>(),
                    Err(CleaningError::InvalidArtifactName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_artifact_name_cannot_carry_version() {
        assert!(Artifact::new("clean_sample.csv", "clean_sample", "").is_ok());
        assert!(Artifact::new("clean_sample.csv:v1", "clean_sample", "").is_err());
    }

    #[test]
    fn test_add_file_rejects_missing_and_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean_sample.csv");
        std::fs::write(&path, "price\n1\n").unwrap();

        let mut artifact = Artifact::new("clean_sample.csv", "clean_sample", "cleaned").unwrap();
        assert!(artifact.add_file(dir.path().join("missing.csv")).is_err());
        artifact.add_file(&path).unwrap();
        assert!(artifact.add_file(&path).is_err());
        assert_eq!(artifact.file_names().unwrap(), vec!["clean_sample.csv"]);
    }

    #[test]
    fn test_fetched_artifact_single_file() {
        let manifest = ArtifactManifest {
            name: "sample.csv".to_string(),
            version: 3,
            artifact_type: "raw_data".to_string(),
            description: "raw".to_string(),
            files: vec!["sample.csv".to_string()],
            created_at: "2026-10-19T00:00:00+00:00".to_string(),
            run_id: None,
        };
        let fetched = FetchedArtifact {
            manifest: manifest.clone(),
            dir: PathBuf::from("/store/sample.csv/v3/files"),
        };
        assert_eq!(
            fetched.file().unwrap(),
            PathBuf::from("/store/sample.csv/v3/files/sample.csv")
        );
        assert_eq!(fetched.version().to_string(), "sample.csv:v3");

        let empty = FetchedArtifact {
            manifest: ArtifactManifest {
                files: vec![],
                ..manifest
            },
            dir: PathBuf::from("/store"),
        };
        assert!(empty.file().is_err());
    }

    fn manifest(name: &str, version: u32, files: &[&str]) -> ArtifactManifest {
        ArtifactManifest {
            name: name.to_string(),
            version,
            artifact_type: "raw_data".to_string(),
            description: "raw".to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            created_at: "2026-10-19T00:00:00+00:00".to_string(),
            run_id: None,
        }
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("sample.csv").is_ok());
        assert!(validate_file_name("my file.csv").is_ok());
        for bad in ["", ".", "..", "../escaped.csv", "dir/sample.csv", "/etc/passwd", "a\\b", "sample.csv/"] {
            assert!(validate_file_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_verify_rejects_escaping_file_entries() {
        let reference: ArtifactRef = "sample.csv".parse().unwrap();
        let err = manifest("sample.csv", 0, &["../../../../escaped.csv"])
            .verify(&reference)
            .unwrap_err();
        assert_eq!(err.error_code(), "ARTIFACT_STORE_ERROR");
    }

    #[test]
    fn test_verify_checks_name_and_pinned_version() {
        let latest: ArtifactRef = "sample.csv:latest".parse().unwrap();
        let pinned: ArtifactRef = "sample.csv:v2".parse().unwrap();

        assert!(manifest("sample.csv", 7, &["sample.csv"]).verify(&latest).is_ok());
        assert!(manifest("sample.csv", 2, &["sample.csv"]).verify(&pinned).is_ok());
        assert!(manifest("sample.csv", 3, &["sample.csv"]).verify(&pinned).is_err());
        assert!(manifest("../other", 2, &["sample.csv"]).verify(&pinned).is_err());
    }

    #[test]
    fn test_fetched_file_rejects_escaping_entry() {
        let fetched = FetchedArtifact {
            manifest: manifest("sample.csv", 0, &["../escaped.csv"]),
            dir: PathBuf::from("/store/sample.csv/v0/files"),
        };
        assert!(fetched.file().is_err());
    }

    #[test]
    fn test_manifest_serializes_type_field() {
        let manifest = ArtifactManifest {
            name: "clean_sample.csv".to_string(),
            version: 0,
            artifact_type: "clean_sample".to_string(),
            description: "cleaned".to_string(),
            files: vec!["clean_sample.csv".to_string()],
            created_at: "2026-10-19T00:00:00+00:00".to_string(),
            run_id: Some("basic_cleaning-1".to_string()),
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"clean_sample\""));
        let back: ArtifactManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_open_store_defaults_to_local() {
        let store = open_store("artifact-store", None).unwrap();
        assert_eq!(store.name(), "local");
    }
}
