//! Row schema for listing datasets.
//!
//! Only three columns are required; every other column is carried through
//! untouched. Validation happens before any filter runs so that a missing
//! column is reported by name instead of surfacing from inside a query.

use crate::error::{CleaningError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use tracing::debug;

/// Columns every listing dataset must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Price,
    Longitude,
    Latitude,
}

impl RequiredColumn {
    pub const ALL: [RequiredColumn; 3] = [Self::Price, Self::Longitude, Self::Latitude];

    /// Column name as it appears in the CSV header.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Longitude => "longitude",
            Self::Latitude => "latitude",
        }
    }
}

/// Validates and normalizes the required listing columns.
pub struct ListingSchema;

impl ListingSchema {
    /// Check that every required column exists and holds numbers.
    ///
    /// Dtypes are only checked for non-empty frames: a header-only CSV has
    /// no values to infer a numeric type from.
    pub fn validate(df: &DataFrame) -> Result<()> {
        for required in RequiredColumn::ALL {
            let column = df
                .column(required.name())
                .map_err(|_| CleaningError::ColumnNotFound(required.name().to_string()))?;

            if df.height() == 0 || Self::is_all_null(column) {
                continue;
            }

            if !is_numeric_dtype(column.dtype()) {
                return Err(CleaningError::InvalidColumnType {
                    column: required.name().to_string(),
                    dtype: column.dtype().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate, then cast required columns that hold only nulls to Float64.
    ///
    /// CSV readers infer text for a column without a single value; the
    /// filters need a numeric column to compare against.
    pub fn conform(df: &DataFrame) -> Result<DataFrame> {
        Self::validate(df)?;

        let mut df = df.clone();
        if df.height() == 0 {
            return Ok(df);
        }

        for required in RequiredColumn::ALL {
            let column = df.column(required.name())?;
            if Self::is_all_null(column) && !is_numeric_dtype(column.dtype()) {
                let cast = column
                    .as_materialized_series()
                    .cast(&DataType::Float64)?;
                df.replace(required.name(), cast)?;
                debug!("Cast all-null column '{}' to Float64", required.name());
            }
        }
        Ok(df)
    }

    fn is_all_null(column: &Column) -> bool {
        column.len() > 0 && column.null_count() == column.len()
    }
}
