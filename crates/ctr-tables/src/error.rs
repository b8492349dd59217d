//! Error types for table conversion.

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use thiserror::Error;

/// Errors that can occur while converting tables.
#[derive(Error, Debug)]
pub enum TableError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Required column missing from the batch
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Column present with the wrong Arrow type
    #[error("column {column} has type {actual}, expected {expected}")]
    ColumnType {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    /// Null in a column that does not allow one
    #[error("null value in column {column} at row {row}")]
    NullValue { column: String, row: usize },

    /// Value that does not map onto a record field
    #[error("invalid value in column {column} at row {row}: {source}")]
    InvalidValue {
        column: String,
        row: usize,
        #[source]
        source: ctr_common::Error,
    },

    /// Batch written under an incompatible schema version
    #[error("incompatible table schema version {found} (current {current})")]
    IncompatibleVersion { found: String, current: String },

    /// Count too large for an Int64 column, or negative when read back
    #[error("count out of range in column {column} at row {row}: {value}")]
    CountOutOfRange {
        column: String,
        row: usize,
        value: i128,
    },
}

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
