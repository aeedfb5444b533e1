//! Streaming HTTP downloader.
//!
//! The body of each response is copied to disk in [`CHUNK_SIZE`] byte chunks.
//! Data lands in `<name>.part` and is renamed to `<name>` only after the last
//! chunk is written, so an interrupted run never leaves a truncated file at the
//! final path.

use crate::{FetchError, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Size of the buffer used when streaming a response body to disk.
pub const CHUNK_SIZE: usize = 8192;

/// Default request timeout. The land-cover raster alone is ~300 MB.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Counter of completed downloads.
pub const DOWNLOADS_METRIC: &str = "basinprep.fetch.downloads";

/// Counter of downloaded bytes.
pub const DOWNLOAD_BYTES_METRIC: &str = "basinprep.fetch.bytes";

/// Download statistics for the downloader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStats {
    /// Number of files downloaded this session.
    pub files_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Blocking HTTP downloader.
pub struct Downloader {
    /// HTTP client used for every request.
    client: reqwest::blocking::Client,
    /// Number of files downloaded this session.
    files_downloaded: AtomicUsize,
    /// Total bytes downloaded this session.
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("stats", &self.download_stats())
            .finish()
    }
}

impl Downloader {
    /// Create a downloader with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a downloader with a specific request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already configured HTTP client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            files_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        }
    }

    /// Whether this downloader can fetch `url` itself.
    ///
    /// Anything other than `http://` or `https://` (e.g. the `ftp://` land-cover
    /// mirror) has to go through an external tool.
    pub fn supports(url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Download `url` into `save_dir`.
    ///
    /// The file is named `local_name` if given, otherwise after the last path
    /// segment of the URL. `save_dir` is created if missing. Returns the file
    /// name that was used.
    pub fn fetch<P: AsRef<Path>>(
        &self,
        url: &str,
        save_dir: P,
        local_name: Option<&str>,
    ) -> Result<String> {
        if !Self::supports(url) {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        let local_name = match local_name {
            Some(name) => name.to_string(),
            None => file_name_from_url(url)?,
        };

        let save_dir = save_dir.as_ref();
        fs::create_dir_all(save_dir)?;

        let final_path = save_dir.join(&local_name);
        let part_path = part_path(&final_path);

        debug!("GET {}", url);
        let mut response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = fs::File::create(&part_path)?;
        let mut buf = [0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            written += n as u64;
        }
        file.flush()?;
        drop(file);

        fs::rename(&part_path, &final_path)?;

        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(written, Ordering::Relaxed);
        metrics::counter!(DOWNLOADS_METRIC).increment(1);
        metrics::counter!(DOWNLOAD_BYTES_METRIC).increment(written);

        info!("Downloaded {} ({} bytes)", final_path.display(), written);
        Ok(local_name)
    }
}

/// Derive a local file name from the last path segment of a URL.
///
/// Query strings and fragments are ignored, so
/// `http://host/files/srtm_44_11.zip?x=1` becomes `srtm_44_11.zip`.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let without_query = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);

    // Host only, no path.
    if !without_scheme.contains('/') {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    match without_scheme.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url(
                "http://srtm.csi.cgiar.org/wp-content/uploads/files/srtm_5x5/TIFF/srtm_44_11.zip"
            )
            .unwrap(),
            "srtm_44_11.zip"
        );
    }

    #[test]
    fn test_file_name_ignores_query() {
        assert_eq!(
            file_name_from_url("https://example.org/data/DSMW.zip?access=private#top").unwrap(),
            "DSMW.zip"
        );
        assert_eq!(
            file_name_from_url("http://www.fao.org/geonetwork/srv/en/resources.get?id=14116&fname=DSMW.zip")
                .unwrap(),
            "resources.get"
        );
    }

    #[test]
    fn test_file_name_requires_path() {
        assert!(file_name_from_url("https://example.org").is_err());
        assert!(file_name_from_url("https://example.org/dir/").is_err());
    }

    #[test]
    fn test_supports() {
        assert!(Downloader::supports("http://example.org/a.zip"));
        assert!(Downloader::supports("HTTPS://example.org/a.zip"));
        assert!(!Downloader::supports(
            "ftp://geo10.elie.ucl.ac.be/v207/ESACCI-LC-L4-LCCS-Map-300m-P1Y-2009-v2.0.7.tif"
        ));
    }

    #[test]
    fn test_unsupported_scheme_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new().unwrap();
        let err = downloader
            .fetch("ftp://example.org/a.tif", dir.path().join("never"), None)
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
        assert!(!dir.path().join("never").exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("temp/soil/DSMW.zip")),
            PathBuf::from("temp/soil/DSMW.zip.part")
        );
    }
}
