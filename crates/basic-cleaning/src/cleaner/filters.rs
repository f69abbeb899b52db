//! Row filters applied by the cleaner.
//!
//! Each filter takes the frame by reference and returns a new one, so the
//! caller's frame is never modified.

use crate::config::{GeoBounds, PriceRange};
use crate::error::Result;
use crate::schema::RequiredColumn;
use polars::prelude::*;

/// Keep rows whose price lies in the closed interval `[min, max]`.
///
/// A null price compares as null and the row is dropped.
pub fn price_filter(df: &DataFrame, range: &PriceRange) -> Result<DataFrame> {
    let predicate = between(RequiredColumn::Price.name(), range.min, range.max);
    Ok(df.clone().lazy().filter(predicate).collect()?)
}

/// Keep rows located inside the fixed New York City bounding box.
pub fn geo_filter(df: &DataFrame) -> Result<DataFrame> {
    let (lon_min, lon_max) = GeoBounds::LONGITUDE;
    let (lat_min, lat_max) = GeoBounds::LATITUDE;

    let predicate = between(RequiredColumn::Longitude.name(), lon_min, lon_max).and(between(
        RequiredColumn::Latitude.name(),
        lat_min,
        lat_max,
    ));
    Ok(df.clone().lazy().filter(predicate).collect()?)
}

/// Drop every row holding a null in any column.
///
/// NaN in a float column counts as missing too.
pub fn null_filter(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 || df.height() == 0 {
        return Ok(df.clone());
    }

    let mut keep = BooleanChunked::full("keep".into(), true, df.height());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        keep = &keep & &series.is_not_null();

        if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
            keep = &keep & &series.is_not_nan()?;
        }
    }

    Ok(df.filter(&keep)?)
}

fn between(column: &str, min: f64, max: f64) -> Expr {
    col(column)
        .gt_eq(lit(min))
        .and(col(column).lt_eq(lit(max)))
}
