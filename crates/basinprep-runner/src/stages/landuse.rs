//! Land use: land-cover raster → basin raster, plus the static lookup.

use super::{StageContext, StageOutcome};
use crate::Result;
use basinprep_fetch::file_name_from_url;
use basinprep_gis::{ResampleMethod, WarpRequest};
use tracing::info;

pub(super) fn run(ctx: &StageContext<'_>) -> Result<StageOutcome> {
    let config = ctx.config;
    let mut outcome = StageOutcome::default();

    let mask = config.mask_path();
    let lookup_source = config.landuse_lookup_source_path();
    ctx.require(&mask)?;
    ctx.require(&lookup_source)?;
    outcome.inputs.extend([mask.clone(), lookup_source.clone()]);

    info!("# Processing landuse");
    let name = file_name_from_url(&config.landuse.url)?;
    let landcover = ctx.download(&config.landuse.url, &config.landuse_dir(), &name, &mut outcome)?;

    let landuse = config.landuse_raster_path();
    if !ctx.skip_existing(&landuse, &mut outcome) {
        // Class codes are categorical: take the most frequent, never interpolate.
        let request = WarpRequest {
            input: landcover,
            output: landuse.clone(),
            cutline: mask,
            resample: ResampleMethod::Mode,
            nodata: config.nodata,
            resolution: config.resolution,
            output_type: config.output_type.clone(),
            target_srs: config.target_srs.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.gdalwarp))?;
    }
    outcome.outputs.push(landuse);

    let lookup = config.landuse_lookup_output_path();
    if ctx.skip_existing(&lookup, &mut outcome) {
        outcome.outputs.push(lookup);
    } else {
        ctx.copy_table(&lookup_source, &lookup, &mut outcome)?;
    }

    Ok(outcome)
}
