//! Run context for provenance tracking.
//!
//! A [`Run`] is created once per job execution and passed explicitly to
//! whatever needs to fetch or publish artifacts. It records the job's
//! configuration together with every artifact version it consumed and
//! produced, and persists that record through the artifact store.

use crate::artifact::{Artifact, ArtifactRef, ArtifactStore, ArtifactVersion, FetchedArtifact};
use crate::error::{CleaningError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Persisted provenance record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub job_type: String,
    pub status: RunStatus,
    /// Flattened job configuration.
    pub config: Map<String, Value>,
    /// Artifact versions read by the run.
    pub used_artifacts: Vec<ArtifactVersion>,
    /// Artifact versions published by the run.
    pub logged_artifacts: Vec<ArtifactVersion>,
    /// RFC 3339 timestamps.
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// `{code, message}` of the error that failed the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// An active run bound to an artifact store.
pub struct Run<'a> {
    store: &'a dyn ArtifactStore,
    record: RunRecord,
}

impl<'a> Run<'a> {
    /// Start a run of `job_type` and record it with the store.
    pub fn init(store: &'a dyn ArtifactStore, job_type: impl Into<String>) -> Result<Self> {
        let job_type = job_type.into();
        let id = format!(
            "{}-{}-{:08x}",
            job_type,
            Utc::now().format("%Y%m%dT%H%M%S"),
            rand::random::<u32>()
        );

        let record = RunRecord {
            id,
            job_type,
            status: RunStatus::Running,
            config: Map::new(),
            used_artifacts: Vec::new(),
            logged_artifacts: Vec::new(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            error: None,
        };

        store.record_run(&record)?;
        info!("Started run {} ({} store)", record.id, store.name());
        Ok(Self { store, record })
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Merge the fields of `config` into the run configuration.
    ///
    /// `config` must serialize to a JSON object; later keys overwrite
    /// earlier ones.
    pub fn config_update<T: Serialize>(&mut self, config: &T) -> Result<()> {
        match serde_json::to_value(config)? {
            Value::Object(fields) => {
                self.record.config.extend(fields);
                Ok(())
            }
            other => Err(CleaningError::InvalidConfig(format!(
                "Run configuration must be an object, got {}",
                other
            ))),
        }
    }

    /// Fetch an artifact and record it as an input of this run.
    pub fn use_artifact(&mut self, reference: &str) -> Result<FetchedArtifact> {
        let reference: ArtifactRef = reference.parse()?;
        let fetched = self.store.fetch(&reference)?;
        debug!("Run {} uses {}", self.record.id, fetched.version());
        self.record.used_artifacts.push(fetched.version());
        Ok(fetched)
    }

    /// Publish an artifact and record it as an output of this run.
    pub fn log_artifact(&mut self, artifact: &Artifact) -> Result<ArtifactVersion> {
        let version = self.store.publish(artifact, Some(&self.record.id))?;
        self.record.logged_artifacts.push(version.clone());
        Ok(version)
    }

    /// Mark the run finished and persist the final record.
    pub fn finish(mut self) -> Result<RunRecord> {
        self.record.status = RunStatus::Finished;
        self.record.finished_at = Some(Utc::now().to_rfc3339());
        self.store.record_run(&self.record)?;
        info!("Finished run {}", self.record.id);
        Ok(self.record)
    }

    /// Mark the run failed and persist the record.
    ///
    /// Persisting is best effort: the original error matters more than a
    /// failure to record it.
    pub fn fail(mut self, error: &CleaningError) -> RunRecord {
        self.record.status = RunStatus::Failed;
        self.record.finished_at = Some(Utc::now().to_rfc3339());
        self.record.error = serde_json::to_value(error).ok();
        if let Err(e) = self.store.record_run(&self.record) {
            warn!("Could not record failed run {}: {}", self.record.id, e);
        }
        self.record
    }
}
