//! Error type for the pipeline.

use basinprep_fetch::FetchError;
use basinprep_gis::GisError;
use basinprep_tables::TableError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can stop a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A download failed or its archive could not be read.
    #[error("Download error: {0}")]
    Fetch(#[from] FetchError),

    /// An external tool failed, or a raster was unreadable or misaligned.
    #[error("GIS tool error: {0}")]
    Gis(#[from] GisError),

    /// A table could not be read or written.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file the stage reads was neither provided nor produced earlier.
    #[error("Required input {} does not exist", .0.display())]
    MissingInput(PathBuf),

    /// The configuration holds a value no stage can use.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tables left unwritten under the `continue` write-error policy.
    #[error("{0} table(s) could not be written")]
    TablesNotWritten(usize),
}
