//! Filesystem-backed artifact store.
//!
//! Layout under the store root:
//!
//! ```text
//! artifacts/<name>/v<N>/manifest.json
//! artifacts/<name>/v<N>/files/<file>
//! runs/<run_id>.json
//! ```
//!
//! A version counts as published once its manifest exists; the manifest is
//! written last, after every file has been copied.

use super::{
    Artifact, ArtifactManifest, ArtifactRef, ArtifactStore, ArtifactVersion, FetchedArtifact,
    VersionSpec, validate_name,
};
use crate::error::{CleaningError, Result, ResultExt};
use crate::run::RunRecord;
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// Artifact store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Published versions of `name`, ascending.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>> {
        validate_name(name)?;
        let dir = self.artifact_dir(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir).context(format!("Listing {}", dir.display()))? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(version) = file_name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            if entry.path().join(MANIFEST_FILE).is_file() {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Path of the JSON record for a run.
    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(format!("{}.json", run_id))
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    fn resolve(&self, reference: &ArtifactRef) -> Result<u32> {
        let versions = self.versions(&reference.name)?;
        match reference.version {
            VersionSpec::Latest => versions.last().copied(),
            VersionSpec::Version(v) => versions.contains(&v).then_some(v),
        }
        .ok_or_else(|| reference.not_found())
    }

    fn read_manifest(&self, name: &str, version: u32) -> Result<ArtifactManifest> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path).context(format!("Reading {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Claim the next free version directory.
    ///
    /// `create_dir` fails on an existing directory, so a version left
    /// half-written by an earlier publish is skipped rather than reused.
    fn claim_version_dir(&self, name: &str) -> Result<(u32, PathBuf)> {
        fs::create_dir_all(self.artifact_dir(name))?;
        let mut version = self.versions(name)?.last().map_or(0, |v| v + 1);
        loop {
            let dir = self.version_dir(name, version);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((version, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => version += 1,
                Err(e) => return Err(CleaningError::Io(e).with_context(format!(
                    "Creating {}",
                    dir.display()
                ))),
            }
        }
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact> {
        let version = self.resolve(reference)?;
        let manifest = self.read_manifest(&reference.name, version)?;
        manifest.verify(reference)?;
        let dir = self.version_dir(&reference.name, version).join(FILES_DIR);

        for file in &manifest.files {
            if !dir.join(file).is_file() {
                return Err(CleaningError::ArtifactStore(format!(
                    "File '{}' of {} is missing from the store",
                    file,
                    manifest.artifact_version()
                )));
            }
        }

        debug!("Resolved {} to {}", reference, manifest.artifact_version());
        Ok(FetchedArtifact { manifest, dir })
    }

    fn publish(&self, artifact: &Artifact, run_id: Option<&str>) -> Result<ArtifactVersion> {
        let file_names = artifact.file_names()?;
        let (version, dir) = self.claim_version_dir(&artifact.name)?;

        let files_dir = dir.join(FILES_DIR);
        fs::create_dir_all(&files_dir)?;
        for (source, file_name) in artifact.files().iter().zip(&file_names) {
            fs::copy(source, files_dir.join(file_name))
                .context(format!("Copying {}", source.display()))?;
        }

        let manifest = ArtifactManifest {
            name: artifact.name.clone(),
            version,
            artifact_type: artifact.artifact_type.clone(),
            description: artifact.description.clone(),
            files: file_names,
            created_at: Utc::now().to_rfc3339(),
            run_id: run_id.map(str::to_string),
        };

        let tmp = dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(&manifest)?)?;
        fs::rename(&tmp, dir.join(MANIFEST_FILE))?;

        let published = manifest.artifact_version();
        info!("Published {} to {}", published, self.root.display());
        Ok(published)
    }

    fn record_run(&self, run: &RunRecord) -> Result<()> {
        let path = self.run_path(&run.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(run)?)
            .context(format!("Writing {}", path.display()))?;
        debug!("Recorded run {} at {}", run.id, path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
