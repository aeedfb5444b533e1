//! Error types for the fetch crate.

use thiserror::Error;

/// Errors that can occur while downloading or extracting datasets.
#[derive(Debug, Error)]
pub enum FetchError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (connection, timeout, body read).
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The remote server answered with a non-success status.
    #[error("Download of {url} failed: HTTP {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Returned status code.
        status: u16,
    },

    /// The URL scheme is not handled by the HTTP client.
    #[error("Unsupported URL scheme for {0} (only http and https are downloaded natively)")]
    UnsupportedScheme(String),

    /// No output file name could be derived from the URL.
    #[error("Cannot derive a file name from URL: {0}")]
    InvalidUrl(String),

    /// Zip archive could not be read.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
