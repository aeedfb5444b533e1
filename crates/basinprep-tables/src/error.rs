//! Error types for the tables crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading inputs or writing tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// A required input file does not exist.
    #[error("Input file {} does not exist", .0.display())]
    MissingInput(PathBuf),

    /// Reading an existing file failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Writing a file failed (e.g. it is locked by another program).
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An expected attribute column is absent.
    #[error("Column '{column}' not found in {}", .path.display())]
    MissingColumn {
        /// Table that was read.
        path: PathBuf,
        /// Column that was looked for.
        column: String,
    },
}
