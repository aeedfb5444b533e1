//! # basinprep-runner
//!
//! Runs the basin preparation pipeline: elevation, soil and land-use rasters
//! on a common grid, the soil and land-use tables, and the directory layout
//! a SWAT+ project setup expects.
//!
//! ## Stages
//!
//! | Stage | Produces |
//! |-------|----------|
//! | `dem` | `data/rasters/dem_<basin>.tif` |
//! | `soil` | `data/rasters/soils_<basin>.tif`, `data/tables/<basin>_usersoil.csv`, `data/tables/<basin>_soil_lookup.csv` |
//! | `landuse` | `data/rasters/landuse_<basin>.tif`, `data/tables/<basin>_landuse_lookup.csv` |
//! | `scaffold` | `data/{observations,calibration,weather,shapefiles}` |
//!
//! Intermediate files live under `temp/`. Completed stages are recorded in
//! `temp/manifest.json` (see [`Manifest`]) and skipped on the next run while
//! their files are unchanged.
//!
//! ## Example
//!
//! ```no_run
//! use basinprep_gis::SystemRunner;
//! use basinprep_runner::{Pipeline, PipelineConfig, Stage};
//!
//! let config = PipelineConfig::load("basinprep.yaml")?;
//! let runner = SystemRunner::new();
//! let report = Pipeline::new(config, &runner)?.run(&[Stage::Dem, Stage::Soil])?;
//! println!("{} stages completed", report.completed.len());
//! # Ok::<(), basinprep_runner::PipelineError>(())
//! ```

pub mod config;
mod error;
pub mod manifest;
mod pipeline;
pub mod stages;
pub mod telemetry;

pub use config::{PipelineConfig, ResumePolicy, WriteErrorPolicy};
pub use error::PipelineError;
pub use manifest::{FileRecord, Manifest, StageRecord};
pub use pipeline::{Pipeline, RunReport};
pub use stages::Stage;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
