//! Pipeline stages and the helpers they share.
//!
//! Each stage is a plain function over a [`StageContext`]. The context carries
//! the configuration, the tool runner and the downloader, and applies the
//! resume and write-error policies uniformly.

mod dem;
mod landuse;
mod scaffold;
mod soil;

use crate::config::{PipelineConfig, ResumePolicy, WriteErrorPolicy};
use crate::telemetry::metric_defs;
use crate::{PipelineError, Result};
use basinprep_fetch::Downloader;
use basinprep_gis::{CurlRequest, ToolInvocation, ToolRunner};
use basinprep_tables::{fsutil, TableError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A named group of pipeline steps, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Download, extract, merge and clip the elevation tiles.
    Dem,
    /// Download, reproject, clip and rasterize the soil map; build soil tables.
    Soil,
    /// Download and clip the land-cover raster; copy its lookup.
    Landuse,
    /// Create the empty directories the modelling tool expects.
    Scaffold,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 4] = [Stage::Dem, Stage::Soil, Stage::Landuse, Stage::Scaffold];

    /// Name used in the CLI, the manifest and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dem => "dem",
            Stage::Soil => "soil",
            Stage::Landuse => "landuse",
            Stage::Scaffold => "scaffold",
        }
    }

    /// Run this stage.
    pub fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutcome> {
        match self {
            Stage::Dem => dem::run(ctx),
            Stage::Soil => soil::run(ctx),
            Stage::Landuse => landuse::run(ctx),
            Stage::Scaffold => scaffold::run(ctx),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage read and produced.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    /// Files whose change invalidates the stage's outputs.
    pub inputs: Vec<PathBuf>,
    /// Files the stage is responsible for.
    pub outputs: Vec<PathBuf>,
    /// Tables that could not be written under [`WriteErrorPolicy::Continue`].
    pub write_failures: Vec<PathBuf>,
    /// Steps skipped because their output existed.
    pub skipped_steps: usize,
    /// Basin soil codes with no reference soil row.
    pub missing_soil_codes: Vec<String>,
}

/// Everything a stage needs.
pub struct StageContext<'a> {
    pub stage: Stage,
    pub config: &'a PipelineConfig,
    pub runner: &'a dyn ToolRunner,
    pub downloader: &'a Downloader,
}

impl<'a> StageContext<'a> {
    pub fn new(
        stage: Stage,
        config: &'a PipelineConfig,
        runner: &'a dyn ToolRunner,
        downloader: &'a Downloader,
    ) -> Self {
        Self {
            stage,
            config,
            runner,
            downloader,
        }
    }

    /// Fail with [`PipelineError::MissingInput`] unless `path` exists.
    pub fn require(&self, path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(PipelineError::MissingInput(path.to_path_buf()))
        }
    }

    /// Whether a derived step can be skipped because its output exists.
    ///
    /// Only in [`ResumePolicy::Existence`] mode; in manifest mode a stage that
    /// runs at all regenerates its derived files.
    pub fn skip_existing(&self, path: &Path, outcome: &mut StageOutcome) -> bool {
        if self.config.resume == ResumePolicy::Existence && path.exists() {
            self.note_skip(path, outcome);
            true
        } else {
            false
        }
    }

    /// Record a skipped step.
    pub fn note_skip(&self, path: &Path, outcome: &mut StageOutcome) {
        info!("{} exists, skipping", path.display());
        outcome.skipped_steps += 1;
        metrics::counter!(metric_defs::STEPS_SKIPPED.name, "stage" => self.stage.as_str()).increment(1);
    }

    /// Delete a file some tool refuses to overwrite.
    pub fn remove_stale(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Run an external tool, creating its output directory first.
    pub fn run_tool(&self, invocation: &ToolInvocation) -> Result<()> {
        if let Some(parent) = invocation.output.parent() {
            fs::create_dir_all(parent)?;
        }
        self.runner.run(invocation)?;
        Ok(())
    }

    /// Download `url` into `dir` as `name` unless it is already there.
    ///
    /// HTTP(S) goes through the built-in client; any other scheme through
    /// curl. Both write a partial file first, so a present file is always a
    /// completed download.
    pub fn download(
        &self,
        url: &str,
        dir: &Path,
        name: &str,
        outcome: &mut StageOutcome,
    ) -> Result<PathBuf> {
        let target = dir.join(name);
        if target.exists() {
            self.note_skip(&target, outcome);
            return Ok(target);
        }

        info!("Downloading {}", name);
        if Downloader::supports(url) {
            self.downloader.fetch(url, dir, Some(name))?;
        } else {
            let part = dir.join(format!("{}.part", name));
            let request = CurlRequest {
                url: url.to_string(),
                output: part.clone(),
            };
            self.run_tool(&request.invocation(&self.config.tools.curl))?;
            fs::rename(&part, &target)?;
        }
        Ok(target)
    }

    /// Write a generated table, honouring the write-error policy.
    pub fn write_table(&self, path: &Path, text: &str, outcome: &mut StageOutcome) -> Result<()> {
        let written = fsutil::write_text(path, text);
        self.apply_write_policy(path, written, outcome)
    }

    /// Copy a static table, honouring the write-error policy.
    pub fn copy_table(&self, src: &Path, dst: &Path, outcome: &mut StageOutcome) -> Result<()> {
        let copied = fsutil::copy_file(src, dst);
        self.apply_write_policy(dst, copied.map(|_| ()), outcome)
    }

    fn apply_write_policy(
        &self,
        path: &Path,
        written: basinprep_tables::Result<()>,
        outcome: &mut StageOutcome,
    ) -> Result<()> {
        match written {
            Ok(()) => {
                info!("Saved {}", path.display());
                outcome.outputs.push(path.to_path_buf());
                Ok(())
            }
            Err(err @ TableError::Write { .. })
                if self.config.on_write_error == WriteErrorPolicy::Continue =>
            {
                warn!("{}; continuing", err);
                outcome.write_failures.push(path.to_path_buf());
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
