//! Soil: DSMW polygons → basin soil raster on the elevation grid, plus the
//! lookup and usersoil tables.

use super::{StageContext, StageOutcome};
use crate::Result;
use basinprep_fetch::extract_zip;
use basinprep_gis::{
    AttributeExportRequest, ClipRequest, RasterGrid, RasterizeRequest, VectorReprojectRequest,
};
use basinprep_tables::fsutil::{file_name, read_lines};
use basinprep_tables::{build_soil_tables, read_soil_records, SoilLookup};
use tracing::{info, warn};

/// Value of cells no soil polygon covers.
const SOIL_FILL: f64 = 0.0;

pub(super) fn run(ctx: &StageContext<'_>) -> Result<StageOutcome> {
    let config = ctx.config;
    let mut outcome = StageOutcome::default();

    let mask = config.mask_path();
    let dem = config.dem_raster_path();
    let reference = config.usersoil_reference_path();
    ctx.require(&mask)?;
    ctx.require(&dem)?;
    ctx.require(&reference)?;
    outcome.inputs.extend([mask.clone(), dem.clone(), reference.clone()]);

    info!("# Downloading soil data, {}", config.soil.archive_name);
    let soil_dir = config.soil_dir();
    let archive = ctx.download(&config.soil.url, &soil_dir, &config.soil.archive_name, &mut outcome)?;

    let shapefile = config.soil_shapefile_path();
    if shapefile.exists() {
        ctx.note_skip(&shapefile, &mut outcome);
    } else {
        info!("Extracting {}", config.soil.archive_name);
        extract_zip(&archive, &soil_dir)?;
        ctx.require(&shapefile)?;
    }

    info!("# Reprojecting soil map to {}", config.target_srs);
    let reprojected = config.soil_reprojected_path();
    if !ctx.skip_existing(&reprojected, &mut outcome) {
        let request = VectorReprojectRequest {
            input: shapefile,
            output: reprojected.clone(),
            source_srs: config.soil_source_srs.clone(),
            target_srs: config.target_srs.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.ogr2ogr))?;
    }

    info!("# Clipping soil map to basin");
    let clipped = config.soil_clipped_path();
    if !ctx.skip_existing(&clipped, &mut outcome) {
        let request = ClipRequest {
            mask: mask.clone(),
            input: reprojected,
            output: clipped.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.ogr2ogr))?;
    }

    let attributes = config.soil_attributes_path();
    if !ctx.skip_existing(&attributes, &mut outcome) {
        // The CSV driver refuses to overwrite.
        ctx.remove_stale(&attributes)?;
        let request = AttributeExportRequest {
            input: clipped.clone(),
            output: attributes.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.ogr2ogr))?;
    }

    info!("# Rasterizing soil map on the DEM grid");
    let dem_grid = RasterGrid::read(&dem)?;
    let soils = config.soil_raster_path();
    if !ctx.skip_existing(&soils, &mut outcome) {
        ctx.remove_stale(&soils)?;
        let request = RasterizeRequest {
            input: clipped.clone(),
            layer: file_name(&clipped, false),
            attribute: config.soil.code_field.clone(),
            output: soils.clone(),
            nodata: dem_grid.nodata.or(Some(config.nodata)),
            grid: dem_grid.clone(),
            fill: SOIL_FILL,
            output_type: config.output_type.clone(),
            target_srs: config.target_srs.clone(),
        };
        ctx.run_tool(&request.invocation(&config.tools.gdal_rasterize))?;
    }
    let soil_grid = RasterGrid::read(&soils)?;
    dem_grid.ensure_aligned(&dem, &soil_grid, &soils)?;
    outcome.outputs.push(soils);

    info!("# Creating usersoil and lookup tables");
    let records = read_soil_records(&attributes, &config.soil.code_field, &config.soil.name_field)?;
    let lookup = SoilLookup::from_records(&records);
    if lookup.is_empty() {
        warn!("Clipped soil layer has no features; soil tables will hold headers only");
    } else {
        info!("{} soil classes in the basin", lookup.len());
    }

    let tables = build_soil_tables(&read_lines(&reference)?, &lookup);
    info!("Kept {} usersoil rows", tables.kept_rows);
    ctx.write_table(&config.usersoil_output_path(), &tables.usersoil, &mut outcome)?;
    ctx.write_table(&config.soil_lookup_output_path(), &tables.lookup, &mut outcome)?;
    outcome.missing_soil_codes = tables.missing_codes;

    Ok(outcome)
}
