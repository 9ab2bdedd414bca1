//! CSV loading and saving

use crate::error::{NidsError, Result};
use crate::inference::PredictionResult;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Name of the predicted-label column appended to prediction output
pub const PREDICTION_COLUMN: &str = "prediction";

/// Name of the confidence column appended to prediction output
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// Reads flow CSVs with every column as raw text
///
/// Type decisions belong to the schema normalizer, so nothing is inferred here.
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with a header row.
    ///
    /// Every record must have as many fields as the header; the first one
    /// that does not is a `SchemaMismatch` naming its line.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => NidsError::FileNotFound(path.display().to_string()),
            _ => NidsError::IoError(e),
        })?;

        if let Some(record) = find_ragged_record(&bytes, self.delimiter) {
            return Err(NidsError::SchemaMismatch(format!(
                "{}: line {} has {} fields, the header has {}",
                path.display(),
                record.line,
                record.fields,
                record.expected
            )));
        }

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| NidsError::DataError(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }
}

/// A record whose field count differs from the header's
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RaggedRecord {
    /// 1-based line the record starts on
    line: usize,
    fields: usize,
    expected: usize,
}

/// Scan raw CSV bytes for the first ragged record.
///
/// Separators and newlines inside double quotes belong to the field; blank
/// lines are skipped, as the reader skips them.
fn find_ragged_record(bytes: &[u8], delimiter: u8) -> Option<RaggedRecord> {
    let mut expected: Option<usize> = None;
    let mut fields = 1;
    let mut blank = true;
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut end_record = |fields: usize, record_line: usize| -> Option<RaggedRecord> {
        match expected {
            None => {
                expected = Some(fields);
                None
            }
            Some(n) if n != fields => Some(RaggedRecord {
                line: record_line,
                fields,
                expected: n,
            }),
            Some(_) => None,
        }
    };

    for &b in bytes {
        match b {
            b'"' => {
                in_quotes = !in_quotes;
                blank = false;
            }
            b'\n' => {
                line += 1;
                if in_quotes {
                    continue;
                }
                if !blank {
                    if let Some(record) = end_record(fields, record_line) {
                        return Some(record);
                    }
                }
                fields = 1;
                blank = true;
                record_line = line;
            }
            b'\r' => {}
            _ if b == delimiter && !in_quotes => {
                fields += 1;
                blank = false;
            }
            _ => blank = false,
        }
    }

    if blank {
        None
    } else {
        end_record(fields, record_line)
    }
}

/// Data saver
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating the parent directory if needed
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| NidsError::DataError(e.to_string()))
    }
}

/// Write the input rows with `prediction` and `confidence` columns appended
pub fn write_predictions_csv(
    input: &DataFrame,
    results: &[PredictionResult],
    path: impl AsRef<Path>,
) -> Result<()> {
    if input.height() != results.len() {
        return Err(NidsError::ShapeError {
            expected: format!("{} predictions", input.height()),
            actual: format!("{} predictions", results.len()),
        });
    }

    let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
    let confidence: Vec<f64> = results.iter().map(|r| r.confidence).collect();

    let mut output = input.clone();
    output.with_column(Series::new(PREDICTION_COLUMN.into(), labels))?;
    output.with_column(Series::new(CONFIDENCE_COLUMN.into(), confidence))?;

    DataSaver::save_csv(&mut output, path.as_ref())?;
    info!(path = %path.as_ref().display(), rows = results.len(), "Predictions written");
    Ok(())
}
