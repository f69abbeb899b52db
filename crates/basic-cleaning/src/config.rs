//! Configuration types for the cleaning step.
//!
//! This module provides the filter bounds and the pipeline configuration,
//! using the builder pattern for ergonomic setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job type recorded for every run of this step.
pub const DEFAULT_JOB_TYPE: &str = "basic_cleaning";

/// Fixed name of the cleaned CSV written before publishing.
pub const CLEAN_SAMPLE_FILE: &str = "clean_sample.csv";

/// Closed price interval `[min, max]` used by the price filter.
///
/// `min <= max` is the caller's responsibility; an inverted range is
/// accepted and simply retains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `min > max`, which makes the price filter drop every row.
    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Geographic bounding box for New York City listings.
///
/// These bounds are fixed policy and are not configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds;

impl GeoBounds {
    /// Inclusive longitude range.
    pub const LONGITUDE: (f64, f64) = (-74.25, -73.50);
    /// Inclusive latitude range.
    pub const LATITUDE: (f64, f64) = (40.5, 41.2);

    pub fn contains(longitude: f64, latitude: f64) -> bool {
        (Self::LONGITUDE.0..=Self::LONGITUDE.1).contains(&longitude)
            && (Self::LATITUDE.0..=Self::LATITUDE.1).contains(&latitude)
    }
}

/// Configuration for one run of the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use basic_cleaning::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_artifact("sample.csv:latest")
///     .output_artifact("clean_sample.csv")
///     .output_type("clean_sample")
///     .output_description("Data with outliers and null values removed")
///     .price_range(10.0, 350.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reference of the artifact to clean (`name`, `name:latest` or `name:vN`).
    pub input_artifact: String,

    /// Name of the artifact to publish.
    pub output_artifact: String,

    /// Type of the published artifact.
    pub output_type: String,

    /// Description of the published artifact.
    pub output_description: String,

    /// Price bounds for the price filter.
    pub price_range: PriceRange,

    /// Directory where `clean_sample.csv` is written.
    /// Default: "."
    pub work_dir: PathBuf,

    /// Job type recorded on the run.
    /// Default: "basic_cleaning"
    pub job_type: String,
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Path of the cleaned CSV inside the working directory.
    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(CLEAN_SAMPLE_FILE)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("input_artifact", &self.input_artifact),
            ("output_artifact", &self.output_artifact),
            ("output_type", &self.output_type),
            ("job_type", &self.job_type),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(field.to_string()));
            }
        }

        for (field, value) in [
            ("min_price", self.price_range.min),
            ("max_price", self.price_range.max),
        ] {
            if !value.is_finite() {
                return Err(ConfigValidationError::NonFinitePrice {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing value for '{0}'")]
    EmptyField(String),

    #[error("Invalid price for '{field}': {value} (must be a finite number)")]
    NonFinitePrice { field: String, value: f64 },
}

impl From<ConfigValidationError> for crate::error::CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::CleaningError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    input_artifact: Option<String>,
    output_artifact: Option<String>,
    output_type: Option<String>,
    output_description: Option<String>,
    price_range: Option<PriceRange>,
    work_dir: Option<PathBuf>,
    job_type: Option<String>,
}

impl PipelineConfigBuilder {
    /// Set the reference of the artifact to clean.
    pub fn input_artifact(mut self, reference: impl Into<String>) -> Self {
        self.input_artifact = Some(reference.into());
        self
    }

    /// Set the name of the artifact to publish.
    pub fn output_artifact(mut self, name: impl Into<String>) -> Self {
        self.output_artifact = Some(name.into());
        self
    }

    /// Set the type of the artifact to publish.
    pub fn output_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.output_type = Some(artifact_type.into());
        self
    }

    /// Set the description of the artifact to publish.
    pub fn output_description(mut self, description: impl Into<String>) -> Self {
        self.output_description = Some(description.into());
        self
    }

    /// Set the closed price interval.
    pub fn price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange::new(min, max));
        self
    }

    /// Set the directory where the cleaned CSV is written.
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    /// Override the job type recorded on the run.
    pub fn job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            input_artifact: self.input_artifact.unwrap_or_default(),
            output_artifact: self.output_artifact.unwrap_or_default(),
            output_type: self.output_type.unwrap_or_default(),
            output_description: self.output_description.unwrap_or_default(),
            price_range: self
                .price_range
                .ok_or_else(|| ConfigValidationError::EmptyField("price_range".to_string()))?,
            work_dir: self.work_dir.unwrap_or_else(|| PathBuf::from(".")),
            job_type: self
                .job_type
                .unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> PipelineConfigBuilder {
        PipelineConfig::builder()
            .input_artifact("sample.csv:latest")
            .output_artifact("clean_sample.csv")
            .output_type("clean_sample")
            .output_description("Data with outliers and null values removed")
            .price_range(10.0, 350.0)
    }

    #[test]
    fn test_builder_defaults() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.job_type, "basic_cleaning");
        assert_eq!(config.work_dir, PathBuf::from("."));
        assert_eq!(config.output_path(), PathBuf::from("./clean_sample.csv"));
        assert_eq!(config.price_range, PriceRange::new(10.0, 350.0));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = base_builder()
            .work_dir("/tmp/cleaning")
            .job_type("basic_cleaning_backfill")
            .build()
            .unwrap();

        assert_eq!(config.job_type, "basic_cleaning_backfill");
        assert_eq!(
            config.output_path(),
            PathBuf::from("/tmp/cleaning/clean_sample.csv")
        );
    }

    #[test]
    fn test_validation_missing_output_type() {
        let result = base_builder().output_type("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyField(field) if field == "output_type"
        ));
    }

    #[test]
    fn test_validation_missing_price_range() {
        let result = PipelineConfig::builder()
            .input_artifact("sample.csv")
            .output_artifact("clean_sample.csv")
            .output_type("clean_sample")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyField(field) if field == "price_range"
        ));
    }

    #[test]
    fn test_validation_non_finite_price() {
        let result = base_builder().price_range(f64::NAN, 100.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NonFinitePrice { .. }
        ));
    }

    #[test]
    fn test_inverted_range_is_accepted() {
        let config = base_builder().price_range(100.0, 10.0).build().unwrap();
        assert!(config.price_range.is_inverted());
        assert!(!config.price_range.contains(50.0));
    }

    #[test]
    fn test_price_range_is_closed() {
        let range = PriceRange::new(10.0, 100.0);
        assert!(range.contains(10.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(9.99));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_geo_bounds_are_inclusive() {
        assert!(GeoBounds::contains(-74.25, 40.5));
        assert!(GeoBounds::contains(-73.50, 41.2));
        assert!(GeoBounds::contains(-74.0, 40.7));
        assert!(!GeoBounds::contains(-70.0, 40.7));
        assert!(!GeoBounds::contains(-74.0, 41.3));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "input_artifact": "sample.csv:v2",
            "output_artifact": "clean_sample.csv",
            "output_type": "clean_sample",
            "output_description": "cleaned",
            "price_range": { "min": 10.0, "max": 350.0 },
            "work_dir": "out",
            "job_type": "basic_cleaning"
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.input_artifact, "sample.csv:v2");
        assert_eq!(config.price_range.max, 350.0);
        assert_eq!(config.work_dir.to_str().unwrap(), "out");
        assert!(config.validate().is_ok());
    }
}
