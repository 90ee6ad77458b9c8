//! Error types shared by the filter, chart, export and query layers.
//!
//! Loader failures never reach callers as errors: they are swallowed into an
//! empty dataset (see [`crate::data::loader::load_or_empty`]).

use thiserror::Error;

/// Errors surfaced by dashboard operations.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// File missing or connection broken.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Unknown chart type, measure, or an otherwise unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The query collaborator rejected the SQL; reported as text, not retried.
    #[error("Query failed: {0}")]
    Query(String),

    /// Malformed configuration file.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// The chart could not be drawn onto the document page.
    #[error("Render error: {0}")]
    Render(String),
}

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<rusqlite::Error> for DashboardError {
    fn from(e: rusqlite::Error) -> Self {
        DashboardError::Query(e.to_string())
    }
}
