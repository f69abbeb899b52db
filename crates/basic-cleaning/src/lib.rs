//! Basic Cleaning Step
//!
//! Cleans a versioned listings dataset and publishes the result as a new
//! artifact version, built with Rust and Polars.
//!
//! # Overview
//!
//! One run of the step:
//!
//! 1. Fetches the input artifact from an [`ArtifactStore`]
//! 2. Loads the CSV into a Polars `DataFrame`
//! 3. Drops rows with a price outside `[min_price, max_price]`
//! 4. Drops rows outside the New York City bounding box
//!    (longitude `[-74.25, -73.50]`, latitude `[40.5, 41.2]`)
//! 5. Drops rows with a null in any column
//! 6. Writes `clean_sample.csv` and publishes it as a new artifact version
//!
//! Every run is recorded with its configuration and the artifact versions it
//! used and produced.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use basic_cleaning::{LocalArtifactStore, Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::builder()
//!     .input_artifact("sample.csv:latest")
//!     .output_artifact("clean_sample.csv")
//!     .output_type("clean_sample")
//!     .output_description("Data with outliers and null values removed")
//!     .price_range(10.0, 350.0)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .store(Arc::new(LocalArtifactStore::new("artifact-store")))
//!     .build()?
//!     .run()?;
//!
//! println!("{} -> {}", result.input, result.output);
//! ```
//!
//! # Cleaning Without a Store
//!
//! The filters are usable on their own:
//!
//! ```rust,ignore
//! use basic_cleaning::clean;
//!
//! let cleaned = clean(&df, 10.0, 350.0)?;
//! ```

pub mod artifact;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod run;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use artifact::{
    Artifact, ArtifactManifest, ArtifactRef, ArtifactStore, ArtifactVersion, FetchedArtifact,
    LocalArtifactStore, VersionSpec, open_store,
};
#[cfg(feature = "remote")]
pub use artifact::{HttpArtifactStore, HttpStoreConfig};
pub use cleaner::{DataCleaner, clean};
pub use config::{
    CLEAN_SAMPLE_FILE, ConfigValidationError, DEFAULT_JOB_TYPE, GeoBounds, PipelineConfig,
    PipelineConfigBuilder, PriceRange,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use io::{load_csv, write_csv};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use run::{Run, RunRecord, RunStatus};
pub use schema::{ListingSchema, RequiredColumn};
pub use types::{CleaningSummary, PipelineResult};
