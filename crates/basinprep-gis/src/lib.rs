//! # basinprep-gis
//!
//! The GIS side of basin preparation. None of the raster or vector processing
//! happens in-process: merging, warping, clipping, reprojection and polygon
//! burning are delegated to the GDAL/OGR command-line utilities.
//!
//! This crate provides:
//! - Typed requests ([`MergeRequest`], [`WarpRequest`], [`ClipRequest`], ...)
//!   that render to a [`ToolInvocation`] with the exact option flags each step
//!   needs.
//! - The [`ToolRunner`] seam. [`SystemRunner`] spawns the real process and
//!   turns a missing program, a nonzero exit status or a missing output file
//!   into a typed [`GisError`].
//! - [`RasterGrid`], a GeoTIFF tag reader that recovers size, geotransform,
//!   EPSG code and nodata without decoding pixel data, used to place the soil
//!   raster on the elevation grid and to verify the two line up.
//!
//! ## Example
//!
//! ```no_run
//! use basinprep_gis::{ResampleMethod, SystemRunner, ToolRunner, WarpRequest};
//!
//! let warp = WarpRequest {
//!     input: "temp/dem/merged/srtm_data.tif".into(),
//!     output: "data/rasters/dem_blue_nile.tif".into(),
//!     cutline: "bn_mask.gpkg".into(),
//!     resample: ResampleMethod::Bilinear,
//!     nodata: -32768.0,
//!     resolution: 300.0,
//!     output_type: "Int32".to_string(),
//!     target_srs: "EPSG:3395".to_string(),
//! };
//! SystemRunner::new().run(&warp.invocation("gdalwarp"))?;
//! # Ok::<(), basinprep_gis::GisError>(())
//! ```

mod error;
mod grid;
mod requests;
mod tool;

pub use error::GisError;
pub use grid::RasterGrid;
pub use requests::{
    AttributeExportRequest, ClipRequest, CurlRequest, MergeRequest, RasterizeRequest,
    ResampleMethod, VectorReprojectRequest, WarpRequest,
};
pub use tool::{SystemRunner, ToolInvocation, ToolRunner, TOOL_INVOCATIONS_METRIC};

/// Result type for GIS operations.
pub type Result<T> = std::result::Result<T, GisError>;
