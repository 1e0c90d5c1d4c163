//! Reading and writing of retail CSV files.
//!
//! Every column is read as text. Numbers and timestamps in retail exports
//! come in several layouts, so they are parsed per cell by the stages that
//! need them instead of by the CSV reader's schema inference.

use crate::error::{MiningError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load a CSV file with every column typed as a string.
///
/// Falls back to a pre-cleaned copy of the content when the file has
/// doubled quotes or blank lines that the reader rejects.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MiningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }

    info!("Loading dataset from: {}", path.display());

    match read_strict(path) {
        Ok(df) => {
            info!("Dataset loaded successfully: {:?}", df.shape());
            return Ok(df);
        }
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    let content = fs::read_to_string(path)?;
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(clean_csv_content(&content)))
        .finish()
        .context(format!("Failed to parse {}", path.display()))?;

    info!("Dataset loaded after pre-cleaning: {:?}", df.shape());
    Ok(df)
}

fn read_strict(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write a DataFrame as CSV with a header, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_csv_reads_every_column_as_string() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("retail.csv");
        fs::write(
            &path,
            "Invoice,StockCode,Quantity,Price\n489434,85048,12,6.95\n489435,79323P,,\n",
        )
        .unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.shape(), (2, 4));
        for column in df.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }
        assert_eq!(df.column("Quantity").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv("does/not/exist.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_write_csv_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let mut df = df!["Invoice" => ["1", "2"], "StockCode" => ["A", "B"]].unwrap();

        write_csv(&mut df, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Invoice,StockCode"));
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn test_clean_csv_content() {
        let cleaned = clean_csv_content("a,b\n\n\"\"x\"\",1\n");
        assert_eq!(cleaned, "a,b\n\"x\",1");
    }
}
