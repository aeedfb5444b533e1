//! Stage orchestration.

use crate::config::{PipelineConfig, ResumePolicy};
use crate::manifest::Manifest;
use crate::stages::{Stage, StageContext};
use crate::telemetry::metric_defs;
use crate::Result;
use basinprep_fetch::{DownloadStats, Downloader};
use basinprep_gis::ToolRunner;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Stages that ran to completion.
    pub completed: Vec<Stage>,
    /// Stages skipped as unchanged since they were recorded.
    pub up_to_date: Vec<Stage>,
    /// Stages that ran but could not write every table.
    pub incomplete: Vec<Stage>,
    /// Tables that could not be written.
    pub write_failures: Vec<PathBuf>,
    /// Steps skipped because their output existed.
    pub skipped_steps: usize,
    /// Basin soil codes with no reference soil row.
    pub missing_soil_codes: Vec<String>,
    /// Files fetched by this run.
    pub downloads: DownloadStats,
}

/// Runs stages in order against one configuration.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    runner: &'a dyn ToolRunner,
    downloader: Downloader,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline with an HTTP client using the configured timeout.
    pub fn new(config: PipelineConfig, runner: &'a dyn ToolRunner) -> Result<Self> {
        let downloader = Downloader::with_timeout(Duration::from_secs(config.http_timeout_secs))?;
        Ok(Self::with_downloader(config, runner, downloader))
    }

    /// Create a pipeline around an existing downloader.
    pub fn with_downloader(config: PipelineConfig, runner: &'a dyn ToolRunner, downloader: Downloader) -> Self {
        Self {
            config,
            runner,
            downloader,
        }
    }

    /// The configuration every stage runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the requested stages, or all of them if none are given.
    ///
    /// Stages always execute in pipeline order, whatever order they are
    /// requested in. The manifest is saved after every stage so an aborted
    /// run keeps the progress made before the failure.
    pub fn run(&self, stages: &[Stage]) -> Result<RunReport> {
        let mut selected: Vec<Stage> = if stages.is_empty() {
            Stage::ALL.to_vec()
        } else {
            stages.to_vec()
        };
        selected.sort();
        selected.dedup();

        let manifest_path = self.config.manifest_path();
        let mut manifest = Manifest::load(&manifest_path)?;
        let mut report = RunReport::default();
        info!(
            "Resume policy: {}, on write error: {}",
            self.config.resume, self.config.on_write_error
        );

        for stage in selected {
            let settings = self.config.settings_hash(stage)?;
            // Scaffolding is idempotent and records no files, so it always runs.
            if self.config.resume == ResumePolicy::Manifest
                && stage != Stage::Scaffold
                && manifest.is_complete(stage, &settings)
            {
                info!("{} stage is up to date, skipping", stage);
                metrics::counter!(metric_defs::STAGES_UP_TO_DATE.name, "stage" => stage.as_str()).increment(1);
                report.up_to_date.push(stage);
                continue;
            }

            info!("Running {} stage", stage);
            let started = Instant::now();
            let ctx = StageContext::new(stage, &self.config, self.runner, &self.downloader);
            let outcome = stage.run(&ctx)?;
            metrics::histogram!(metric_defs::STAGE_DURATION.name, "stage" => stage.as_str())
                .record(started.elapsed().as_secs_f64());

            report.skipped_steps += outcome.skipped_steps;
            report.missing_soil_codes.extend(outcome.missing_soil_codes);

            if outcome.write_failures.is_empty() {
                manifest.record(stage, &settings, &outcome.inputs, &outcome.outputs)?;
                metrics::counter!(metric_defs::STAGES_COMPLETED.name, "stage" => stage.as_str()).increment(1);
                report.completed.push(stage);
            } else {
                warn!(
                    "{} stage left {} table(s) unwritten; it will run again next time",
                    stage,
                    outcome.write_failures.len()
                );
                manifest.forget(stage);
                report.write_failures.extend(outcome.write_failures);
                report.incomplete.push(stage);
            }
            manifest.save(&manifest_path)?;
        }

        report.downloads = self.downloader.download_stats();
        Ok(report)
    }
}
