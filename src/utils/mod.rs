//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    write_predictions_csv, DataLoader, DataSaver, CONFIDENCE_COLUMN, PREDICTION_COLUMN,
};
