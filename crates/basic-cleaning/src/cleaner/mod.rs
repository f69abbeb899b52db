//! Data cleaning module for listing datasets.
//!
//! This module provides the three row filters of the cleaning step:
//! - Price outliers outside a closed `[min, max]` range
//! - Listings outside the New York City bounding box
//! - Rows with a null in any column

mod filters;

pub use filters::{geo_filter, null_filter, price_filter};

use crate::config::{GeoBounds, PriceRange};
use crate::error::Result;
use crate::schema::ListingSchema;
use crate::types::CleaningSummary;
use crate::utils::format_bound;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Data cleaner applying the price, geolocation and null filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    /// Clean a dataset, returning the retained rows and a summary.
    ///
    /// Steps run in a fixed order so the intermediate counts are
    /// reproducible:
    /// 1. Drop rows with a price outside `range`
    /// 2. Drop rows outside the fixed geolocation bounds
    /// 3. Drop rows with a null in any column
    ///
    /// The input frame is left untouched.
    pub fn clean(&self, df: &DataFrame, range: &PriceRange) -> Result<(DataFrame, CleaningSummary)> {
        let df = ListingSchema::conform(df)?;
        let mut summary = CleaningSummary {
            rows_before: df.height(),
            columns: df.width(),
            ..Default::default()
        };

        if range.is_inverted() {
            warn!(
                "min_price {} is greater than max_price {}; no rows can be retained",
                range.min, range.max
            );
        }

        if df.height() == 0 {
            summary.actions.push("Input dataset is empty".to_string());
            debug!("Input dataset is empty, nothing to clean");
            return Ok((df, summary));
        }

        info!("Drop outliers");
        let df = price_filter(&df, range)?;
        summary.rows_after_price = df.height();
        summary.actions.push(format!(
            "Dropped {} rows with price outside [{}, {}]",
            summary.rows_before - summary.rows_after_price,
            format_bound(range.min),
            format_bound(range.max)
        ));
        debug!("{} rows after price filter", summary.rows_after_price);

        info!("Dropping rows with improper geolocation");
        let df = geo_filter(&df)?;
        summary.rows_after_geo = df.height();
        summary.actions.push(format!(
            "Dropped {} rows with longitude outside [{}, {}] or latitude outside [{}, {}]",
            summary.rows_after_price - summary.rows_after_geo,
            format_bound(GeoBounds::LONGITUDE.0),
            format_bound(GeoBounds::LONGITUDE.1),
            format_bound(GeoBounds::LATITUDE.0),
            format_bound(GeoBounds::LATITUDE.1)
        ));
        debug!("{} rows after geolocation filter", summary.rows_after_geo);

        info!("Dropping null values");
        let df = null_filter(&df)?;
        summary.rows_after = df.height();
        summary.actions.push(format!(
            "Dropped {} rows with null values",
            summary.rows_after_geo - summary.rows_after
        ));
        debug!("{} rows after null filter", summary.rows_after);

        Ok((df, summary))
    }
}

/// Clean a dataset with the given price bounds.
///
/// Shorthand for [`DataCleaner::clean`] when the summary is not needed.
pub fn clean(df: &DataFrame, min_price: f64, max_price: f64) -> Result<DataFrame> {
    DataCleaner
        .clean(df, &PriceRange::new(min_price, max_price))
        .map(|(df, _)| df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleaningError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_records_intermediate_counts() {
        let df = df!(
            "price" => [Some(50.0), Some(5.0), Some(50.0), Some(50.0), Some(80.0)],
            "longitude" => [-74.0, -74.0, -70.0, -74.0, -73.95],
            "latitude" => [Some(40.7), Some(40.7), Some(40.7), None, Some(40.75)],
            "other" => ["x", "y", "z", "w", "v"]
        )
        .unwrap();

        let (cleaned, summary) = DataCleaner
            .clean(&df, &PriceRange::new(10.0, 100.0))
            .unwrap();

        assert_eq!(cleaned.height(), 2);
        assert_eq!(summary.rows_before, 5);
        assert_eq!(summary.rows_after_price, 4);
        // The null latitude fails the geolocation predicate before the null step.
        assert_eq!(summary.rows_after_geo, 2);
        assert_eq!(summary.rows_after, 2);
        assert_eq!(summary.columns, 4);
        assert_eq!(
            summary.actions[0],
            "Dropped 1 rows with price outside [10, 100]"
        );
    }

    #[test]
    fn test_clean_preserves_other_columns() {
        let df = df!(
            "id" => [7i64],
            "price" => [50.0],
            "longitude" => [-74.0],
            "latitude" => [40.7],
            "neighbourhood" => ["Harlem"]
        )
        .unwrap();

        let cleaned = clean(&df, 10.0, 100.0).unwrap();
        assert_eq!(cleaned.get_column_names(), df.get_column_names());
        assert!(cleaned.equals(&df));
    }

    #[test]
    fn test_clean_missing_column_is_fatal() {
        let df = df!(
            "price" => [50.0],
            "latitude" => [40.7]
        )
        .unwrap();

        let err = clean(&df, 10.0, 100.0).unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(ref c) if c == "longitude"));
    }

    #[test]
    fn test_clean_empty_frame() {
        let df = df!(
            "price" => Vec::<f64>::new(),
            "longitude" => Vec::<f64>::new(),
            "latitude" => Vec::<f64>::new()
        )
        .unwrap();

        let (cleaned, summary) = DataCleaner.clean(&df, &PriceRange::new(10.0, 100.0)).unwrap();
        assert_eq!(cleaned.height(), 0);
        assert_eq!(cleaned.width(), 3);
        assert_eq!(summary.rows_removed(), 0);
    }

    #[test]
    fn test_clean_inverted_range_yields_empty() {
        let df = df!(
            "price" => [50.0],
            "longitude" => [-74.0],
            "latitude" => [40.7]
        )
        .unwrap();

        let cleaned = clean(&df, 100.0, 10.0).unwrap();
        assert_eq!(cleaned.height(), 0);
    }
}
