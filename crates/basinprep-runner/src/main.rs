//! basinprep CLI - prepare basin rasters and tables for a SWAT+ setup

use basinprep_gis::{RasterGrid, SystemRunner};
use basinprep_runner::telemetry::describe_metrics;
use basinprep_runner::{
    Pipeline, PipelineConfig, PipelineError, ResumePolicy, RunReport, Stage, WriteErrorPolicy,
};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "basinprep")]
#[command(author, version, about = "Prepare basin rasters and tables for hydrological modelling", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (YAML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pipeline stages
    Run {
        /// Stage to run (repeatable); all stages when omitted
        #[arg(short, long, value_enum)]
        stage: Vec<Stage>,
        /// Working directory, overriding the configuration
        #[arg(short, long)]
        work_dir: Option<PathBuf>,
        /// How re-runs decide what to skip
        #[arg(long, value_enum)]
        resume: Option<ResumePolicy>,
        /// What to do when a table cannot be written
        #[arg(long, value_enum)]
        on_write_error: Option<WriteErrorPolicy>,
    },
    /// Print the effective configuration as YAML
    Config,
    /// Show a raster's grid, or check that two rasters share one
    Grid {
        /// Reference raster
        raster: PathBuf,
        /// Raster to compare against the reference
        other: Option<PathBuf>,
    },
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    describe_metrics();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), PipelineError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Run {
            stage,
            work_dir,
            resume,
            on_write_error,
        } => {
            if let Some(dir) = work_dir {
                config.work_dir = dir;
            }
            if let Some(policy) = resume {
                config.resume = policy;
            }
            if let Some(policy) = on_write_error {
                config.on_write_error = policy;
            }
            config.validate()?;

            let runner = SystemRunner::new();
            let pipeline = Pipeline::new(config, &runner)?;
            let report = pipeline.run(&stage)?;
            print_report(&report);
            if !report.incomplete.is_empty() {
                return Err(PipelineError::TablesNotWritten(report.write_failures.len()));
            }
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
        Commands::Grid { raster, other } => {
            let grid = RasterGrid::read(&raster)?;
            print_grid(&raster, &grid);
            if let Some(other) = other {
                let other_grid = RasterGrid::read(&other)?;
                print_grid(&other, &other_grid);
                grid.ensure_aligned(&raster, &other_grid, &other)?;
                println!("Grids are aligned");
            }
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &RunReport) {
    let names = |stages: &[Stage]| {
        stages
            .iter()
            .map(Stage::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    info!("Completed: {}", names(&report.completed));
    if !report.up_to_date.is_empty() {
        info!("Up to date: {}", names(&report.up_to_date));
    }
    info!(
        "Downloaded {} file(s), {:.1} MB; {} step(s) skipped",
        report.downloads.files_downloaded,
        report.downloads.bytes_downloaded as f64 / 1_048_576.0,
        report.skipped_steps
    );
    if !report.missing_soil_codes.is_empty() {
        info!(
            "Soil codes without usersoil rows: {}",
            report.missing_soil_codes.join(", ")
        );
    }
    for path in &report.write_failures {
        eprintln!("Not written: {}", path.display());
    }
}

fn print_grid(path: &Path, grid: &RasterGrid) {
    let (xmin, ymin, xmax, ymax) = grid.extent();
    println!("{}", path.display());
    println!("  Size:       {} x {}", grid.width, grid.height);
    println!("  Origin:     ({}, {})", grid.geotransform[0], grid.geotransform[3]);
    println!("  Pixel size: ({}, {})", grid.geotransform[1], grid.geotransform[5]);
    println!("  Extent:     {} {} {} {}", xmin, ymin, xmax, ymax);
    match grid.epsg {
        Some(code) => println!("  SRS:        EPSG:{}", code),
        None => println!("  SRS:        unknown"),
    }
    if let Some(nodata) = grid.nodata {
        println!("  NoData:     {}", nodata);
    }
}
