//! Schema normalizer
//!
//! Turns raw CSV cells into a fixed numeric feature matrix. In training mode
//! the schema is inferred from the data; in inference mode a locked schema is
//! applied verbatim.

use crate::error::{NidsError, Result};
use super::schema::{
    ColumnKind, FeatureColumn, FeatureSchema, LabelEncoder, MISSING_CODE, UNKNOWN_CODE,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

/// Labeled feature matrix produced in training mode
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// One row per usable input row, columns in schema order
    pub features: Array2<f64>,
    /// Label codes, parallel to `features`
    pub labels: Array1<f64>,
    /// Rows dropped because their label cell was empty
    pub dropped_rows: usize,
}

/// Cell-level counters from a transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStats {
    /// Empty cells replaced by the fill value or the missing code
    pub imputed: usize,
    /// Categorical values routed to the unknown code
    pub unknown: usize,
}

/// Converts raw string cells into numeric features
#[derive(Debug, Clone, Default)]
pub struct SchemaNormalizer {
    schema: Option<FeatureSchema>,
    label_encoder: Option<LabelEncoder>,
    locked: bool,
}

impl SchemaNormalizer {
    /// Create a normalizer that will infer its schema on `fit_transform`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer bound to an existing schema
    pub fn locked(schema: FeatureSchema) -> Self {
        Self {
            schema: Some(schema),
            label_encoder: None,
            locked: true,
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn label_encoder(&self) -> Option<&LabelEncoder> {
        self.label_encoder.as_ref()
    }

    /// Hand out the fitted schema and label encoder
    pub fn into_parts(self) -> Option<(FeatureSchema, LabelEncoder)> {
        match (self.schema, self.label_encoder) {
            (Some(schema), Some(labels)) => Some((schema, labels)),
            _ => None,
        }
    }

    /// Infer a schema from `df` and encode it, splitting off `label_column`
    pub fn fit_transform(&mut self, df: &DataFrame, label_column: &str) -> Result<TrainingData> {
        if self.locked {
            return Err(NidsError::ConfigError(
                "normalizer schema is locked; it cannot be refitted".to_string(),
            ));
        }
        let start = Instant::now();
        let header = column_names(df);

        if !header.iter().any(|c| c == label_column) {
            return Err(NidsError::SchemaMismatch(format!(
                "label column '{}' not found in input columns [{}]",
                label_column,
                header.join(", ")
            )));
        }

        let label_cells = column_cells(df, label_column)?;
        let usable: Vec<usize> = label_cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_ref().map(|_| i))
            .collect();
        let dropped_rows = label_cells.len() - usable.len();

        if usable.is_empty() {
            return Err(NidsError::EmptyDataset(format!(
                "no rows with a value in label column '{}'",
                label_column
            )));
        }

        let feature_names: Vec<&String> = header.iter().filter(|c| *c != label_column).collect();
        if feature_names.is_empty() {
            return Err(NidsError::SchemaMismatch(
                "input has no feature columns besides the label".to_string(),
            ));
        }

        let mut schema_columns = Vec::with_capacity(feature_names.len());
        let mut encoded_columns: Vec<Vec<f64>> = Vec::with_capacity(feature_names.len());

        for name in feature_names {
            let cells = column_cells(df, name)?;
            let cells: Vec<Option<&str>> = usable.iter().map(|&i| cells[i].as_deref()).collect();
            let (column, values) = infer_column(name, &cells);
            debug!(
                column = %name,
                categorical = column.is_categorical(),
                "Inferred feature column"
            );
            schema_columns.push(column);
            encoded_columns.push(values);
        }

        let label_encoder =
            LabelEncoder::fit(usable.iter().filter_map(|&i| label_cells[i].as_deref()));
        let labels: Array1<f64> = usable
            .iter()
            .filter_map(|&i| label_cells[i].as_deref())
            .map(|label| label_encoder.encode(label).unwrap_or(0) as f64)
            .collect();

        let features = to_row_major(&encoded_columns, usable.len());
        let schema = FeatureSchema::new(schema_columns);

        info!(
            rows = usable.len(),
            dropped_rows,
            features = schema.len(),
            classes = label_encoder.n_classes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Derived feature schema"
        );

        self.schema = Some(schema);
        self.label_encoder = Some(label_encoder);

        Ok(TrainingData {
            features,
            labels,
            dropped_rows,
        })
    }

    /// Encode `df` with the fitted or locked schema
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.transform_with_stats(df).map(|(features, _)| features)
    }

    /// Encode `df` and report how many cells were imputed or unknown
    pub fn transform_with_stats(&self, df: &DataFrame) -> Result<(Array2<f64>, CellStats)> {
        let schema = self.schema.as_ref().ok_or(NidsError::ModelNotTrained)?;
        let header = column_names(df);

        let missing = schema.missing_columns(&header);
        if !missing.is_empty() {
            return Err(NidsError::SchemaMismatch(format!(
                "input is missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let n_rows = df.height();
        if n_rows == 0 {
            return Err(NidsError::EmptyDataset("input has no rows".to_string()));
        }

        let mut stats = CellStats::default();
        let mut encoded_columns: Vec<Vec<f64>> = Vec::with_capacity(schema.len());

        for column in schema.columns() {
            let cells = column_cells(df, &column.name)?;
            let values = match &column.kind {
                ColumnKind::Numeric { fill_value } => {
                    encode_numeric(&column.name, &cells, *fill_value, &mut stats)?
                }
                ColumnKind::Categorical { categories } => {
                    encode_categorical(&cells, categories, &mut stats)
                }
            };
            encoded_columns.push(values);
        }

        if stats.unknown > 0 {
            debug!(unknown = stats.unknown, "Routed unseen categories to the unknown code");
        }

        Ok((to_row_major(&encoded_columns, n_rows), stats))
    }
}

/// Column names of `df` in header order
pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.as_str().to_string())
        .collect()
}

/// Read a column as trimmed strings, empty cells as `None`
fn column_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| NidsError::SchemaMismatch(format!("missing column: {}", name)))?;
    let as_text = column.cast(&DataType::String)?;
    let ca = as_text.str()?;

    Ok(ca
        .into_iter()
        .map(|cell| {
            cell.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decide numeric vs categorical for one training column and encode it
fn infer_column(name: &str, cells: &[Option<&str>]) -> (FeatureColumn, Vec<f64>) {
    let parsed: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(parse_number)).collect();
    let is_numeric = cells
        .iter()
        .zip(&parsed)
        .all(|(cell, value)| cell.is_none() || value.is_some());

    if is_numeric {
        let fill_value = running_mean(parsed.iter().flatten().copied());
        let values = parsed.iter().map(|v| v.unwrap_or(fill_value)).collect();
        return (FeatureColumn::numeric(name, fill_value), values);
    }

    let mut categories: Vec<String> = Vec::new();
    let mut codes: HashMap<&str, usize> = HashMap::new();
    let values = cells
        .iter()
        .map(|cell| match cell {
            None => MISSING_CODE,
            Some(value) => {
                let next = codes.len();
                let code = *codes.entry(*value).or_insert_with(|| {
                    categories.push(value.to_string());
                    next
                });
                code as f64
            }
        })
        .collect();

    (FeatureColumn::categorical(name, categories), values)
}

/// Mean that stays finite for finite input; 0.0 when empty
fn running_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut mean = 0.0;
    for (k, value) in values.enumerate() {
        mean += (value - mean) / (k + 1) as f64;
    }
    mean
}

fn encode_numeric(
    name: &str,
    cells: &[Option<String>],
    fill_value: f64,
    stats: &mut CellStats,
) -> Result<Vec<f64>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => {
                stats.imputed += 1;
                Ok(fill_value)
            }
            Some(text) => parse_number(text).ok_or_else(|| {
                NidsError::SchemaMismatch(format!(
                    "column '{}' row {}: '{}' is not numeric",
                    name, row, text
                ))
            }),
        })
        .collect()
}

fn encode_categorical(
    cells: &[Option<String>],
    categories: &[String],
    stats: &mut CellStats,
) -> Vec<f64> {
    let lookup: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(code, value)| (value.as_str(), code))
        .collect();

    cells
        .iter()
        .map(|cell| match cell {
            None => {
                stats.imputed += 1;
                MISSING_CODE
            }
            Some(value) => match lookup.get(value.as_str()) {
                Some(&code) => code as f64,
                None => {
                    stats.unknown += 1;
                    UNKNOWN_CODE
                }
            },
        })
        .collect()
}

/// Build a row-major matrix from column vectors
fn to_row_major(columns: &[Vec<f64>], n_rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r])
}
