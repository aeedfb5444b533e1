//! Metric declarations.
//!
//! The library crates record through the `metrics` facade under names they
//! export; this module describes those alongside the pipeline's own. No exporter is installed by the binary, so recording is a
//! no-op unless an embedding application installs a recorder.

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

/// A metric name with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Unit,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
            unit,
            labels: &[],
        }
    }

    pub const fn histogram(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description,
            unit,
            labels: &[],
        }
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Downloads (basinprep-fetch)
    // ========================================================================

    pub const DOWNLOADS: Metric =
        Metric::counter(basinprep_fetch::DOWNLOADS_METRIC, "Files downloaded over HTTP", Unit::Count);

    pub const DOWNLOAD_BYTES: Metric =
        Metric::counter(basinprep_fetch::DOWNLOAD_BYTES_METRIC, "Bytes downloaded over HTTP", Unit::Bytes);

    // ========================================================================
    // External tools (basinprep-gis)
    // ========================================================================

    pub const TOOL_INVOCATIONS: Metric = Metric::counter(
        basinprep_gis::TOOL_INVOCATIONS_METRIC,
        "External GDAL/OGR/curl processes started",
        Unit::Count,
    )
    .with_labels(&["program"]);

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Steps not run because their output already exists.
    pub const STEPS_SKIPPED: Metric = Metric::counter(
        "basinprep.pipeline.steps_skipped",
        "Steps skipped because their output exists",
        Unit::Count,
    )
    .with_labels(&["stage"]);

    pub const STAGES_COMPLETED: Metric = Metric::counter(
        "basinprep.pipeline.stages_completed",
        "Stages run to completion",
        Unit::Count,
    )
    .with_labels(&["stage"]);

    /// Stages skipped as unchanged since the manifest recorded them.
    pub const STAGES_UP_TO_DATE: Metric = Metric::counter(
        "basinprep.pipeline.stages_up_to_date",
        "Stages skipped as recorded complete in the manifest",
        Unit::Count,
    )
    .with_labels(&["stage"]);

    pub const STAGE_DURATION: Metric = Metric::histogram(
        "basinprep.pipeline.stage_duration",
        "Wall time of each executed stage",
        Unit::Seconds,
    )
    .with_labels(&["stage"]);

    pub const ALL: &[&Metric] = &[
        &DOWNLOADS,
        &DOWNLOAD_BYTES,
        &TOOL_INVOCATIONS,
        &STEPS_SKIPPED,
        &STAGES_COMPLETED,
        &STAGES_UP_TO_DATE,
        &STAGE_DURATION,
    ];
}

/// Describe every metric. Call once at startup.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
