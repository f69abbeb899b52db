//! CSV loading and saving.

use crate::error::{Result, ResultExt};
use crate::utils::NULL_MARKERS;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Load a CSV file with a header row into a DataFrame.
///
/// The schema is inferred from the whole file so a column that only turns
/// fractional late in the file is still read as float. Common missing-value
/// markers (`NA`, `NaN`, `null`, empty cells, ...) are read as null.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|s| (*s).into()).collect());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(null_values)),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    info!("Loaded {} ({} rows x {} columns)", path.display(), df.height(), df.width());
    Ok(df)
}

/// Write a DataFrame as comma-separated UTF-8 with a header row.
///
/// No index column is written. Parent directories are created as needed.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut df = df.clone();
    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .context(format!("Writing {}", path.display()))?;

    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_csv_reads_null_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        fs::write(
            &path,
            "id,price,name,reviews_per_month\n1,50,loft,NaN\n2,60,,1.5\n3,70,NA,2.0\n",
        )
        .unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("name").unwrap().null_count(), 2);
        assert_eq!(df.column("reviews_per_month").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_infers_from_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let mut contents = String::from("price\n");
        for _ in 0..200 {
            contents.push_str("10\n");
        }
        contents.push_str("12.5\n");
        fs::write(&path, contents).unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.column("price").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_csv(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_write_csv_has_header_and_no_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/clean_sample.csv");
        let df = df!(
            "price" => [50i64, 60],
            "name" => ["loft, large", "studio"]
        )
        .unwrap();

        write_csv(&df, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "price,name");
        assert_eq!(lines[1], "50,\"loft, large\"");
        assert_eq!(lines[2], "60,studio");
    }
}
