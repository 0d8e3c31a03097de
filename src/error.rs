use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::Category;

/// Errors surfaced by the library to its callers.
#[derive(Error, Debug)]
pub enum CricketError {
    #[error("delivery data file not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("dataset {path} is missing required columns: {columns:?}")]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("row {row}: invalid value {value:?} in column {column}")]
    BadRow {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("unknown {category} {name:?}: not in the encoding vocabulary")]
    UnknownCategory { category: Category, name: String },

    #[error("ambiguous {category} {name:?}: {rows} encoding rows match")]
    AmbiguousCategory {
        category: Category,
        name: String,
        rows: usize,
    },

    #[error("{category} {name:?} has a vector of width {actual}, expected {expected}")]
    WidthMismatch {
        category: Category,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{} setup names cannot be encoded: {}", .0.len(), joined(.0))]
    UnresolvedNames(Vec<CricketError>),

    #[error("classifier returned unknown outcome label {0}")]
    InvalidOutcomeLabel(i64),

    #[error("invalid outcome model: {0}")]
    InvalidModel(String),

    #[error("invalid simulation setup: {0}")]
    InvalidSetup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CricketError>;

fn joined(errors: &[CricketError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
