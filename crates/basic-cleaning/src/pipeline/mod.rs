//! Pipeline module.
//!
//! This module provides the cleaning pipeline driver and its progress types.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
