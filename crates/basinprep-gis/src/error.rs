//! Error types for the GIS crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by external tool runs and raster metadata reads.
#[derive(Debug, Error)]
pub enum GisError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF {path}: {reason}")]
    InvalidGeoTiff {
        /// File that was read.
        path: PathBuf,
        /// What was missing or malformed.
        reason: String,
    },

    /// The external program could not be found on PATH.
    #[error("Tool '{0}' not found (is GDAL installed and on PATH?)")]
    ToolNotFound(String),

    /// The external program exited with a nonzero status.
    #[error("'{program}' failed with {}: {stderr}", exit_description(.status))]
    ToolFailed {
        /// Program name.
        program: String,
        /// Exit code, `None` if killed by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The program exited successfully but did not produce its output.
    #[error("'{program}' reported success but {} was not created", .path.display())]
    MissingOutput {
        /// Program name.
        program: String,
        /// Expected output path.
        path: PathBuf,
    },

    /// Two rasters that must share a grid do not.
    #[error("Raster {} is not aligned with {}: {detail}", .other.display(), .reference.display())]
    GridMismatch {
        /// Reference raster (the elevation grid).
        reference: PathBuf,
        /// Raster compared against it.
        other: PathBuf,
        /// First difference found.
        detail: String,
    },
}

fn exit_description(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
