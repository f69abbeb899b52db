//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] when it enters each stage and
//! when it completes or fails. Reporters receive updates synchronously.

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Starting the run and recording its configuration
    Initializing,
    /// Downloading the input artifact
    Fetching,
    /// Parsing the CSV into a dataset
    Loading,
    /// Applying the price, geolocation and null filters
    Cleaning,
    /// Writing the cleaned CSV
    Saving,
    /// Publishing the output artifact
    Publishing,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Fetching => "Fetching Artifact",
            Self::Loading => "Loading Dataset",
            Self::Cleaning => "Cleaning Data",
            Self::Saving => "Saving Dataset",
            Self::Publishing => "Publishing Artifact",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Cumulative progress at the start of this stage (0.0 - 1.0).
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Fetching => 0.05,
            Self::Loading => 0.30,
            Self::Cleaning => 0.45,
            Self::Saving => 0.60,
            Self::Publishing => 0.70,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates an update marking the start of `stage`.
    pub fn new(stage: CleaningStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.base_progress(),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Complete, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Failed, message)
    }
}

// Updates may be forwarded to another thread by a reporter
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(CleaningStage: Send, Sync, Copy);

/// Trait for receiving progress updates from the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use basic_cleaning::{ProgressReporter, ProgressUpdate};
///
/// struct StderrReporter;
///
/// impl ProgressReporter for StderrReporter {
///     fn report(&self, update: ProgressUpdate) {
///         eprintln!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     }
/// }
/// ```
pub trait ProgressReporter {
    /// Called when the pipeline enters a stage, completes or fails.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate),
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate),
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate),
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Cleaning, "Cleaning...");
        assert_eq!(update.stage, CleaningStage::Cleaning);
        assert_eq!(update.progress, 0.45);
        assert_eq!(update.message, "Cleaning...");
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done!");
        assert_eq!(update.stage, CleaningStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_closure_progress_reporter() {
        let stages = RefCell::new(Vec::new());
        let reporter = ClosureProgressReporter::new(|update: ProgressUpdate| {
            stages.borrow_mut().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::Fetching, "Fetching"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(
            stages.into_inner(),
            vec![CleaningStage::Fetching, CleaningStage::Complete]
        );
    }

    #[test]
    fn test_stage_progress_is_monotonic() {
        let stages = [
            CleaningStage::Initializing,
            CleaningStage::Fetching,
            CleaningStage::Loading,
            CleaningStage::Cleaning,
            CleaningStage::Saving,
            CleaningStage::Publishing,
            CleaningStage::Complete,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].base_progress() < pair[1].base_progress());
        }
    }

    #[test]
    fn test_stage_json_values() {
        let stage_expectations = [
            (CleaningStage::Initializing, "\"initializing\""),
            (CleaningStage::Fetching, "\"fetching\""),
            (CleaningStage::Publishing, "\"publishing\""),
            (CleaningStage::Failed, "\"failed\""),
        ];

        for (stage, expected_json) in stage_expectations {
            let json = serde_json::to_string(&stage).expect("Should serialize");
            assert_eq!(json, expected_json);
        }
        assert_eq!(CleaningStage::Saving.display_name(), "Saving Dataset");
    }
}
