//! Feature schema and label encoding
//!
//! The schema is derived once from training data and then travels inside the
//! model artifact, so inference re-applies exactly the same column order,
//! imputation values and category codes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Code for a categorical cell that was empty
pub const MISSING_CODE: f64 = -1.0;

/// Code for a categorical value never seen during training
pub const UNKNOWN_CODE: f64 = -2.0;

/// How a single feature column is turned into a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Parsed as f64; empty cells take `fill_value` (the training mean)
    Numeric { fill_value: f64 },
    /// Encoded by position in `categories` (first-seen order)
    Categorical { categories: Vec<String> },
}

/// One feature column of the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl FeatureColumn {
    pub fn numeric(name: impl Into<String>, fill_value: f64) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric { fill_value },
        }
    }

    pub fn categorical(name: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical { categories },
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, ColumnKind::Categorical { .. })
    }
}

/// Ordered list of feature columns a model was trained on
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Number of features (width of every feature row)
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Feature names in matrix order
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Names from the schema that are absent from `available`
    pub fn missing_columns<'a>(&'a self, available: &[String]) -> Vec<&'a str> {
        self.columns
            .iter()
            .filter(|c| !available.iter().any(|a| a == &c.name))
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Bidirectional class name ↔ code mapping
///
/// Codes are assigned in first-seen order and are the `f64` values the
/// classifiers are trained on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PartialEq for LabelEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.classes == other.classes
    }
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an encoder from labels in row order
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut encoder = Self::new();
        for label in labels {
            encoder.encode_or_insert(label);
        }
        encoder
    }

    /// Code for `label`, assigning the next code if unseen
    pub fn encode_or_insert(&mut self, label: &str) -> usize {
        if let Some(&code) = self.index.get(label) {
            return code;
        }
        if let Some(code) = self.classes.iter().position(|c| c == label) {
            self.index.insert(label.to_string(), code);
            return code;
        }
        let code = self.classes.len();
        self.classes.push(label.to_string());
        self.index.insert(label.to_string(), code);
        code
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.index
            .get(label)
            .copied()
            .or_else(|| self.classes.iter().position(|c| c == label))
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Classes matching any of `benign` (case-insensitive)
    pub fn benign_classes(&self, benign: &[String]) -> Vec<String> {
        self.classes
            .iter()
            .filter(|c| benign.iter().any(|b| b.eq_ignore_ascii_case(c)))
            .cloned()
            .collect()
    }
}
