//! CLI entry point for the basic cleaning step.

use anyhow::Result;
use basic_cleaning::{ArtifactStore, Pipeline, PipelineConfig, open_store};
use clap::Parser;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming the artifact store (directory or http(s) URL).
const STORE_ENV: &str = "BASIC_CLEANING_STORE";

/// Environment variable holding the bearer token for an HTTP store.
const API_KEY_ENV: &str = "BASIC_CLEANING_API_KEY";

/// Store used when `BASIC_CLEANING_STORE` is not set.
const DEFAULT_STORE: &str = "./artifact-store";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "A very basic data cleaning",
    long_about = "Fetches a listings dataset artifact, drops price outliers, rows outside the \
                  New York City bounding box and rows with null values, then publishes the \
                  result as a new artifact.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  BASIC_CLEANING_STORE      Artifact store directory or http(s) URL \
                  (default: ./artifact-store)\n  \
                  BASIC_CLEANING_API_KEY    Bearer token for an HTTP artifact store\n  \
                  RUST_LOG                  Log filter (default: info)\n\n\
                  EXAMPLE:\n  \
                  basic-cleaning --input_artifact sample.csv:latest \\\n    \
                  --output_artifact clean_sample.csv --output_type clean_sample \\\n    \
                  --output_description \"Data with outliers and null values removed\" \\\n    \
                  --min_price 10 --max_price 350"
)]
struct Args {
    /// Name for input artifact
    #[arg(long = "input_artifact", alias = "input-artifact")]
    input_artifact: String,

    /// Name of processed artifact
    #[arg(long = "output_artifact", alias = "output-artifact")]
    output_artifact: String,

    /// Type of artifact
    #[arg(long = "output_type", alias = "output-type")]
    output_type: String,

    /// Description of output artifact
    #[arg(long = "output_description", alias = "output-description")]
    output_description: String,

    /// Minimum price for Price column
    #[arg(long = "min_price", alias = "min-price", allow_negative_numbers = true)]
    min_price: f64,

    /// Maximum price for Price column
    #[arg(long = "max_price", alias = "max-price", allow_negative_numbers = true)]
    max_price: f64,
}

/// Initialize the tracing subscriber for logging.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file before reading RUST_LOG
    dotenv().ok();
    init_logging();

    let config = PipelineConfig::builder()
        .input_artifact(args.input_artifact)
        .output_artifact(args.output_artifact)
        .output_type(args.output_type)
        .output_description(args.output_description)
        .price_range(args.min_price, args.max_price)
        .build()?;

    let location = env::var(STORE_ENV).unwrap_or_else(|_| DEFAULT_STORE.to_string());
    let api_key = env::var(API_KEY_ENV).ok();
    let store: Arc<dyn ArtifactStore> = Arc::from(open_store(&location, api_key)?);
    info!("Using {} artifact store at {}", store.name(), location);

    let result = Pipeline::builder()
        .config(config)
        .store(store)
        .on_progress(|update| {
            debug!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?
        .run()?;

    let summary = &result.summary;
    info!(
        "Rows: {} -> {} ({} removed, {:.1}% retained)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed(),
        summary.retention_percentage()
    );
    info!(
        "Published {} from {} in {}ms (run {})",
        result.output, result.input, result.duration_ms, result.run_id
    );

    Ok(())
}
