//! Main cleaning pipeline module.
//!
//! This module provides the `Pipeline` struct and builder that sequence one
//! run of the cleaning step: fetch, load, clean, save, publish.

use crate::artifact::{Artifact, ArtifactStore, ArtifactVersion};
use crate::cleaner::DataCleaner;
use crate::config::PipelineConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::io::{load_csv, write_csv};
use crate::pipeline::progress::{
    CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::run::Run;
use crate::types::{CleaningSummary, PipelineResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use basic_cleaning::{LocalArtifactStore, Pipeline, PipelineConfig};
/// use std::sync::Arc;
///
/// let config = PipelineConfig::builder()
///     .input_artifact("sample.csv:latest")
///     .output_artifact("clean_sample.csv")
///     .output_type("clean_sample")
///     .output_description("Data with outliers and null values removed")
///     .price_range(10.0, 350.0)
///     .build()?;
///
/// let result = Pipeline::builder()
///     .config(config)
///     .store(Arc::new(LocalArtifactStore::new("artifact-store")))
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .run()?;
///
/// println!("Published {}", result.output);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ArtifactStore>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the pipeline once, start to finish.
    ///
    /// Any failure aborts the run; the run record is marked failed and the
    /// error is returned unchanged.
    pub fn run(&self) -> Result<PipelineResult> {
        match self.run_internal() {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Published {}",
                    result.output
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                if e.is_schema_error() {
                    error!(
                        "{} must provide numeric price, longitude and latitude columns",
                        self.config.input_artifact
                    );
                }
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<PipelineResult> {
        let started = Instant::now();

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            format!("Starting {} run", self.config.job_type),
        ));
        let mut run = Run::init(self.store.as_ref(), &self.config.job_type)?;

        match self.execute(&mut run) {
            Ok((input, output, summary)) => {
                let run_id = run.id().to_string();
                let record = run.finish().map_err(|e| {
                    error!(
                        "Run {} published {} but could not be recorded as finished: {}",
                        run_id, output, e
                    );
                    e.with_context(format!(
                        "Run {} published {} but its record was not finalized",
                        run_id, output
                    ))
                })?;
                Ok(PipelineResult {
                    run_id: record.id,
                    input,
                    output,
                    output_path: self.config.output_path(),
                    summary,
                    duration_ms: started.elapsed().as_millis() as u64,
                })
            }
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        run: &mut Run<'_>,
    ) -> Result<(ArtifactVersion, ArtifactVersion, CleaningSummary)> {
        let config = &self.config;
        run.config_update(&json!({
            "input_artifact": config.input_artifact,
            "output_artifact": config.output_artifact,
            "output_type": config.output_type,
            "output_description": config.output_description,
            "min_price": config.price_range.min,
            "max_price": config.price_range.max,
        }))?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Fetching,
            format!("Fetching {}", config.input_artifact),
        ));
        info!("Downloading artifact file to process");
        let fetched = run
            .use_artifact(&config.input_artifact)
            .context("Fetching input artifact")?;
        let input = fetched.version();
        let input_path = fetched.file()?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            format!("Loading {}", input),
        ));
        let df = load_csv(&input_path)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Cleaning,
            format!("Cleaning {} rows", df.height()),
        ));
        let (df, summary) = self.cleaner.clean(&df, &config.price_range)?;
        for action in &summary.actions {
            info!("{}", action);
        }

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Saving,
            format!("Saving {} rows", summary.rows_after),
        ));
        info!("Saving the df as csv");
        let output_path = config.output_path();
        write_csv(&df, &output_path)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Publishing,
            format!("Publishing {}", config.output_artifact),
        ));
        let mut artifact = Artifact::new(
            &config.output_artifact,
            &config.output_type,
            &config.output_description,
        )?;
        artifact.add_file(&output_path)?;
        info!("Logging artifact");
        let output = run
            .log_artifact(&artifact)
            .context("Publishing output artifact")?;

        Ok((input, output, summary))
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    store: Option<Arc<dyn ArtifactStore>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the artifact store used for fetching, publishing and run records.
    pub fn store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set a progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a closure to receive progress updates.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Both a configuration and a store are required.
    pub fn build(self) -> Result<Pipeline> {
        let config = self
            .config
            .ok_or_else(|| CleaningError::InvalidConfig("Pipeline needs a configuration".to_string()))?;
        config.validate()?;

        let store = self
            .store
            .ok_or_else(|| CleaningError::InvalidConfig("Pipeline needs an artifact store".to_string()))?;

        Ok(Pipeline {
            config,
            store,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactRef, FetchedArtifact, LocalArtifactStore};
    use crate::run::{RunRecord, RunStatus};

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .input_artifact("sample.csv")
            .output_artifact("clean_sample.csv")
            .output_type("clean_sample")
            .output_description("cleaned")
            .price_range(10.0, 100.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_store() {
        let result = Pipeline::builder().config(config()).build();
        assert!(matches!(result, Err(CleaningError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_requires_config() {
        let result = Pipeline::builder()
            .store(Arc::new(LocalArtifactStore::new("unused")))
            .build();
        assert!(matches!(result, Err(CleaningError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_revalidates_config() {
        let mut config = config();
        config.output_artifact = String::new();
        let result = Pipeline::builder()
            .config(config)
            .store(Arc::new(LocalArtifactStore::new("unused")))
            .build();
        assert!(matches!(result, Err(CleaningError::InvalidConfig(_))));
    }

    /// Local store whose run records cannot be finalized.
    struct UnfinishableStore {
        inner: LocalArtifactStore,
    }

    impl ArtifactStore for UnfinishableStore {
        fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact> {
            self.inner.fetch(reference)
        }

        fn publish(&self, artifact: &Artifact, run_id: Option<&str>) -> Result<ArtifactVersion> {
            self.inner.publish(artifact, run_id)
        }

        fn record_run(&self, run: &RunRecord) -> Result<()> {
            if run.status == RunStatus::Finished {
                return Err(CleaningError::ArtifactStore("runs endpoint unavailable".to_string()));
            }
            self.inner.record_run(run)
        }

        fn name(&self) -> &str {
            "unfinishable"
        }
    }

    #[test]
    fn test_unrecorded_finish_reports_published_output() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let inner = LocalArtifactStore::new(root.path());

        let raw = work.path().join("sample.csv");
        std::fs::write(&raw, "price,longitude,latitude\n50,-74.0,40.7\n").unwrap();
        let mut seed = Artifact::new("sample.csv", "raw_data", "raw").unwrap();
        seed.add_file(&raw).unwrap();
        inner.publish(&seed, None).unwrap();

        let mut config = config();
        config.work_dir = work.path().join("out");
        let pipeline = Pipeline::builder()
            .config(config)
            .store(Arc::new(UnfinishableStore {
                inner: inner.clone(),
            }))
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.error_code(), "ARTIFACT_STORE_ERROR");
        assert!(err.to_string().contains("published clean_sample.csv:v0"));
        assert_eq!(inner.versions("clean_sample.csv").unwrap(), vec![0]);
    }

    #[test]
    fn test_missing_input_fails_run() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalArtifactStore::new(root.path()));

        let mut config = config();
        config.work_dir = work.path().to_path_buf();
        let pipeline = Pipeline::builder()
            .config(config)
            .store(store.clone())
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.error_code(), "ARTIFACT_NOT_FOUND");
        assert!(!work.path().join("clean_sample.csv").exists());
    }
}
