//! Record of completed stages, used to skip work on re-runs.
//!
//! For every completed stage the manifest keeps the completion time, a hash
//! of the settings the stage ran with, and the length and SHA-256 of the files
//! the stage read and wrote. A stage counts as complete only while its
//! settings are unchanged and all of those files still hash the same.

use crate::stages::Stage;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST_VERSION: u32 = 2;

/// Hex SHA-256 of a byte string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash a file's contents.
pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Length in bytes, checked before hashing.
    pub bytes: u64,
    /// Hex SHA-256 of the contents.
    pub sha256: String,
}

impl FileRecord {
    /// Fingerprint the file at `path` as it is now.
    pub fn of<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            sha256: sha256_file(path)?,
        })
    }

    /// Whether the file still exists with the recorded contents.
    pub fn is_current(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() == self.bytes => {}
            _ => return false,
        }
        matches!(sha256_file(&self.path), Ok(hash) if hash == self.sha256)
    }
}

/// One completed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub completed_at: DateTime<Utc>,
    /// Hash of the configuration the stage ran with.
    pub settings: String,
    pub inputs: Vec<FileRecord>,
    pub outputs: Vec<FileRecord>,
}

impl StageRecord {
    /// First recorded file that no longer matches, if any.
    pub fn first_stale(&self) -> Option<&FileRecord> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|record| !record.is_current())
    }
}

/// Completed stages, keyed by stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub stages: BTreeMap<Stage, StageRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            stages: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Load the manifest at `path`.
    ///
    /// A missing file is an empty manifest. So is an unreadable or
    /// incompatible one, after a warning: every stage simply runs again.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        match serde_json::from_str::<Manifest>(&text) {
            Ok(manifest) if manifest.version == MANIFEST_VERSION => {
                debug!("Loaded manifest {} ({} stages)", path.display(), manifest.stages.len());
                Ok(manifest)
            }
            Ok(manifest) => {
                warn!(
                    "Ignoring manifest {} with version {} (expected {})",
                    path.display(),
                    manifest.version,
                    MANIFEST_VERSION
                );
                Ok(Self::default())
            }
            Err(e) => {
                warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Write the manifest, replacing any previous one atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        debug!("Saved manifest {}", path.display());
        Ok(())
    }

    /// Record `stage` as completed now under `settings`, fingerprinting its
    /// files.
    pub fn record<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        stage: Stage,
        settings: &str,
        inputs: &[P],
        outputs: &[Q],
    ) -> Result<()> {
        let record = StageRecord {
            completed_at: Utc::now(),
            settings: settings.to_string(),
            inputs: inputs.iter().map(FileRecord::of).collect::<Result<_>>()?,
            outputs: outputs.iter().map(FileRecord::of).collect::<Result<_>>()?,
        };
        self.stages.insert(stage, record);
        Ok(())
    }

    /// Whether `stage` was recorded under `settings` and every file it
    /// recorded is unchanged.
    pub fn is_complete(&self, stage: Stage, settings: &str) -> bool {
        let Some(record) = self.stages.get(&stage) else {
            return false;
        };
        if record.settings != settings {
            debug!("{} stage is stale: settings changed", stage);
            return false;
        }
        match record.first_stale() {
            None => true,
            Some(stale) => {
                debug!("{} stage is stale: {} changed", stage, stale.path.display());
                false
            }
        }
    }

    /// Drop any record of `stage`, so the next run repeats it.
    pub fn forget(&mut self, stage: Stage) {
        self.stages.remove(&stage);
    }
}
