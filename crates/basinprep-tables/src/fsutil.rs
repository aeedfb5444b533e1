//! File and directory helpers shared by every stage.

use crate::{Result, TableError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List the files directly inside `dir`, optionally only those with the given
/// extension (without the dot). A missing directory yields an empty list.
/// Results are sorted by path.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(TableError::Read {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| TableError::Read {
                path: dir.to_path_buf(),
                source: e,
            })?
            .path();
        if !path.is_file() {
            continue;
        }
        let keep = match extension {
            None => true,
            Some(ext) => path.extension().and_then(|e| e.to_str()) == Some(ext),
        };
        if keep {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read a text file into lines (line terminators removed).
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TableError::MissingInput(path.to_path_buf()),
        _ => TableError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    debug!("Read {} ({} bytes)", path.display(), text.len());
    Ok(text.lines().map(str::to_string).collect())
}

/// Write `text` to `path`, creating parent directories as needed.
pub fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| TableError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Saved {}", path.display());
    Ok(())
}

/// Copy `src` to `dst` verbatim, creating `dst`'s parent directories.
/// Returns the number of bytes copied.
pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<u64> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !src.exists() {
        return Err(TableError::MissingInput(src.to_path_buf()));
    }
    ensure_parent(dst)?;
    fs::copy(src, dst).map_err(|e| TableError::Write {
        path: dst.to_path_buf(),
        source: e,
    })
}

/// Create a directory and its parents if absent. Returns `true` if it was created.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<bool> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| TableError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;
    info!("Created directory {}", dir.display());
    Ok(true)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).map(|_| ()),
        _ => Ok(()),
    }
}

/// Final component of `path`, with or without its extension.
///
/// Without the extension everything from the first dot is dropped, so
/// `ESACCI-LC.v2.0.7.tif` becomes `ESACCI-LC`.
pub fn file_name<P: AsRef<Path>>(path: P, with_extension: bool) -> String {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if with_extension {
        name
    } else {
        name.split('.').next().unwrap_or_default().to_string()
    }
}
