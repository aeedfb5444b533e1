//! # basinprep-fetch
//!
//! Download and extraction helpers for the raw datasets a basin setup starts from:
//! - SRTM 5x5 degree elevation tile archives
//! - The FAO Digital Soil Map of the World archive
//! - Global land-cover rasters
//!
//! ## Overview
//!
//! Downloads are streamed to disk in fixed-size chunks through a blocking
//! HTTP client. The body is written to a `.part` file first and renamed once
//! complete, so a file sitting at the final path is always a finished download.
//! There is no retry, no resume and no checksum verification.
//!
//! Zip archives are extracted in full into a target directory.
//!
//! ## Example
//!
//! ```no_run
//! use basinprep_fetch::{extract_zip, Downloader};
//!
//! let downloader = Downloader::new()?;
//! let name = downloader.fetch(
//!     "http://srtm.csi.cgiar.org/wp-content/uploads/files/srtm_5x5/TIFF/srtm_44_11.zip",
//!     "temp/dem/raw",
//!     None,
//! )?;
//! extract_zip(format!("temp/dem/raw/{}", name), "temp/dem/extracted")?;
//! # Ok::<(), basinprep_fetch::FetchError>(())
//! ```

mod download;
mod error;
mod extract;

pub use download::{
    file_name_from_url, DownloadStats, Downloader, CHUNK_SIZE, DEFAULT_TIMEOUT_SECS, DOWNLOADS_METRIC,
    DOWNLOAD_BYTES_METRIC,
};
pub use error::FetchError;
pub use extract::extract_zip;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
