use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Fatal failure to produce the base dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("cannot parse dataset: {0}")]
    Polars(#[from] PolarsError),

    #[error("required column `{0}` is missing")]
    MissingColumn(String),

    #[error("column `{column}` has unsupported type {dtype}")]
    ColumnType { column: String, dtype: String },

    #[error("no known timestamp format matches column `{0}`")]
    UndetectedTimestampFormat(String),
}

/// Invalid exploratory filter selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("the dataset has trip types, so a trip type must be selected")]
    TripTypeRequired,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("export i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
