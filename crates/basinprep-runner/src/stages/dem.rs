//! Elevation: tiles → mosaic → basin raster.

use super::{StageContext, StageOutcome};
use crate::{PipelineError, Result};
use basinprep_fetch::extract_zip;
use basinprep_gis::{MergeRequest, ResampleMethod, WarpRequest};
use basinprep_tables::fsutil::{ensure_dir, file_name, list_files};
use std::collections::HashSet;
use tracing::info;

pub(super) fn run(ctx: &StageContext<'_>) -> Result<StageOutcome> {
    let config = ctx.config;
    let mut outcome = StageOutcome::default();

    let mask = config.mask_path();
    ctx.require(&mask)?;
    outcome.inputs.push(mask.clone());

    info!("# Downloading DEM raw data");
    let raw_dir = config.dem_raw_dir();
    let mut archives = Vec::with_capacity(config.dem.tiles.len());
    for tile in &config.dem.tiles {
        let url = format!("{}{}", config.dem.base_url, tile);
        archives.push(ctx.download(&url, &raw_dir, tile, &mut outcome)?);
    }
    // Tiles left over from an earlier tile list stay out of the mosaic.
    let stems: HashSet<String> = archives.iter().map(|a| file_name(a, false)).collect();

    info!("# Extracting downloaded DEM tiles");
    let extracted_dir = config.dem_extracted_dir();
    ensure_dir(&extracted_dir)?;
    for archive in &archives {
        let tif = extracted_dir.join(format!("{}.tif", file_name(archive, false)));
        if tif.exists() {
            ctx.note_skip(&tif, &mut outcome);
            continue;
        }
        info!("Extracting {}", file_name(archive, true));
        extract_zip(archive, &extracted_dir)?;
    }

    info!("# Merging DEM tiles");
    let merged = config.dem_merged_path();
    if !ctx.skip_existing(&merged, &mut outcome) {
        let inputs: Vec<_> = list_files(&extracted_dir, Some("tif"))?
            .into_iter()
            .filter(|tif| stems.contains(&file_name(tif, false)))
            .collect();
        if inputs.is_empty() {
            return Err(PipelineError::MissingInput(extracted_dir));
        }
        // gdal_merge updates an existing output in place.
        ctx.remove_stale(&merged)?;
        let request = MergeRequest {
            inputs,
            output: merged.clone(),
            nodata: config.nodata,
        };
        ctx.run_tool(&request.invocation(&config.tools.gdal_merge))?;
    }

    info!("# Clipping DEM");
    let dem = config.dem_raster_path();
    if !ctx.skip_existing(&dem, &mut outcome) {
        let request = WarpRequest {
            input: merged,
            output: dem.clone(),
            cutline: mask,
            resample: ResampleMethod::Bilinear,
            nodata: config.nodata,
            resolution: config.resolution,
            output_type: config.output_type.clone(),
            target_srs: config.target_srs.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.gdalwarp))?;
    }
    outcome.outputs.push(dem);

    Ok(outcome)
}
