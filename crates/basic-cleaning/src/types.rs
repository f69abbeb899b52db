//! Result types produced by the cleaner and the pipeline driver.

use crate::artifact::ArtifactVersion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Row counts and actions recorded while cleaning a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Rows in the input dataset.
    pub rows_before: usize,
    /// Rows left after the price filter.
    pub rows_after_price: usize,
    /// Rows left after the geolocation filter.
    pub rows_after_geo: usize,
    /// Rows left after dropping nulls (the final row count).
    pub rows_after: usize,
    /// Columns in the dataset (unchanged by cleaning).
    pub columns: usize,
    /// Human-readable description of each step.
    pub actions: Vec<String>,
}

impl CleaningSummary {
    /// Total number of rows removed by all filters.
    pub fn rows_removed(&self) -> usize {
        self.rows_before - self.rows_after
    }

    /// Percentage of input rows that survived cleaning.
    pub fn retention_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            return 100.0;
        }
        (self.rows_after as f64 / self.rows_before as f64) * 100.0
    }
}

/// Outcome of a complete pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Identifier of the run that produced the artifact.
    pub run_id: String,
    /// The input artifact version that was cleaned.
    pub input: ArtifactVersion,
    /// The newly published artifact version.
    pub output: ArtifactVersion,
    /// Local path of the cleaned CSV.
    pub output_path: PathBuf,
    /// Cleaning statistics.
    pub summary: CleaningSummary,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}
