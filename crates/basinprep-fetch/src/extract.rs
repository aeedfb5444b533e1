//! Zip archive extraction.

use crate::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Extract every entry of a zip archive into `target_dir`.
///
/// The directory is created if absent and existing files are overwritten.
/// Entries whose names would land outside `target_dir` are skipped. Returns
/// the paths of the extracted files in archive order.
pub fn extract_zip<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, target_dir: Q) -> Result<Vec<PathBuf>> {
    let archive_path = archive_path.as_ref();
    let target_dir = target_dir.as_ref();
    fs::create_dir_all(target_dir)?;

    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe zip entry {:?} in {}", entry.name(), archive_path.display());
            continue;
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        debug!("Extracted {}", out_path.display());
        extracted.push(out_path);
    }

    Ok(extracted)
}
