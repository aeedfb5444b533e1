//! Typed builders for each GDAL/OGR call the pipeline makes.

use crate::{RasterGrid, ToolInvocation};
use std::fmt;
use std::path::PathBuf;

/// Resampling rule used by `gdalwarp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResampleMethod {
    /// Bilinear interpolation, for continuous data such as elevation.
    Bilinear,
    /// Majority of contributing cells, for categorical data such as land cover.
    Mode,
}

impl ResampleMethod {
    /// Name as accepted by `gdalwarp -r`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Mode => "mode",
        }
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mosaic several rasters into one without resampling (`gdal_merge`).
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Rasters to merge, in paint order.
    pub inputs: Vec<PathBuf>,
    /// Mosaic to create.
    pub output: PathBuf,
    /// Nodata value assigned to the output band.
    pub nodata: f64,
}

impl MergeRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        let mut inv = ToolInvocation::new(program, &self.output)
            .arg("-o")
            .path_arg(&self.output)
            .arg("-a_nodata")
            .arg(self.nodata.to_string());
        for input in &self.inputs {
            inv = inv.path_arg(input);
        }
        inv
    }
}

/// Warp a raster to the target projection, resolution and type, cut to a mask
/// (`gdalwarp`).
#[derive(Debug, Clone)]
pub struct WarpRequest {
    /// Source raster.
    pub input: PathBuf,
    /// Raster to create (overwritten if present).
    pub output: PathBuf,
    /// Polygon file used as cutline; the output is cropped to it.
    pub cutline: PathBuf,
    /// Resampling rule.
    pub resample: ResampleMethod,
    /// Destination nodata value.
    pub nodata: f64,
    /// Square cell size in target SRS units.
    pub resolution: f64,
    /// GDAL data type name, e.g. `Int32`.
    pub output_type: String,
    /// Target SRS, e.g. `EPSG:3395`.
    pub target_srs: String,
}

impl WarpRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        let res = self.resolution.to_string();
        ToolInvocation::new(program, &self.output)
            .arg("-r")
            .arg(self.resample.as_str())
            .arg("-dstnodata")
            .arg(self.nodata.to_string())
            .arg("-tr")
            .arg(res.clone())
            .arg(res)
            .arg("-ot")
            .arg(self.output_type.clone())
            .arg("-t_srs")
            .arg(self.target_srs.clone())
            .arg("-of")
            .arg("GTiff")
            .arg("-cutline")
            .path_arg(&self.cutline)
            .arg("-crop_to_cutline")
            .path_arg(&self.input)
            .path_arg(&self.output)
            .arg("-overwrite")
    }
}

/// Reproject a vector dataset to a shapefile (`ogr2ogr`).
#[derive(Debug, Clone)]
pub struct VectorReprojectRequest {
    /// Source vector dataset.
    pub input: PathBuf,
    /// Shapefile to create.
    pub output: PathBuf,
    /// SRS the source is in.
    pub source_srs: String,
    /// SRS to reproject to.
    pub target_srs: String,
}

impl VectorReprojectRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        ToolInvocation::new(program, &self.output)
            .arg("-f")
            .arg("ESRI Shapefile")
            .arg("-overwrite")
            .arg("-t_srs")
            .arg(self.target_srs.clone())
            .arg("-s_srs")
            .arg(self.source_srs.clone())
            .path_arg(&self.output)
            .path_arg(&self.input)
    }
}

/// Keep only the parts of a vector layer that intersect a mask (`ogr2ogr -clipsrc`).
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// Mask polygon file.
    pub mask: PathBuf,
    /// Vector dataset to clip.
    pub input: PathBuf,
    /// Clipped dataset to create.
    pub output: PathBuf,
}

impl ClipRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        ToolInvocation::new(program, &self.output)
            .arg("-overwrite")
            .arg("-clipsrc")
            .path_arg(&self.mask)
            .path_arg(&self.output)
            .path_arg(&self.input)
    }
}

/// Dump a vector layer's attribute table to CSV (`ogr2ogr -f CSV`).
///
/// The CSV driver cannot overwrite in place, so `output` must not exist.
#[derive(Debug, Clone)]
pub struct AttributeExportRequest {
    /// Vector dataset.
    pub input: PathBuf,
    /// CSV file to create.
    pub output: PathBuf,
}

impl AttributeExportRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        ToolInvocation::new(program, &self.output)
            .arg("-f")
            .arg("CSV")
            .path_arg(&self.output)
            .path_arg(&self.input)
    }
}

/// Burn a polygon attribute onto a grid (`gdal_rasterize`).
///
/// Features are burnt in layer order, so where polygons overlap the last one
/// wins. Cells no polygon touches keep the `fill` value. `output` must not
/// exist; gdal_rasterize refuses to recreate an existing dataset.
#[derive(Debug, Clone)]
pub struct RasterizeRequest {
    /// Vector dataset holding the polygons.
    pub input: PathBuf,
    /// Layer name inside `input`.
    pub layer: String,
    /// Attribute whose value is burnt.
    pub attribute: String,
    /// Raster to create.
    pub output: PathBuf,
    /// Grid the output must match.
    pub grid: RasterGrid,
    /// Value for cells outside every polygon.
    pub fill: f64,
    /// Nodata value recorded in the output metadata.
    pub nodata: Option<f64>,
    /// GDAL data type name.
    pub output_type: String,
    /// SRS assigned to the output.
    pub target_srs: String,
}

impl RasterizeRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        let (xmin, ymin, xmax, ymax) = self.grid.extent();
        let mut inv = ToolInvocation::new(program, &self.output)
            .arg("-a")
            .arg(self.attribute.clone())
            .arg("-init")
            .arg(self.fill.to_string());
        if let Some(nodata) = self.nodata {
            inv = inv.arg("-a_nodata").arg(nodata.to_string());
        }
        inv.arg("-te")
            .arg(xmin.to_string())
            .arg(ymin.to_string())
            .arg(xmax.to_string())
            .arg(ymax.to_string())
            .arg("-ts")
            .arg(self.grid.width.to_string())
            .arg(self.grid.height.to_string())
            .arg("-ot")
            .arg(self.output_type.clone())
            .arg("-a_srs")
            .arg(self.target_srs.clone())
            .arg("-co")
            .arg("COMPRESS=LZW")
            .arg("-l")
            .arg(self.layer.clone())
            .path_arg(&self.input)
            .path_arg(&self.output)
    }
}

/// Fetch a URL the HTTP client cannot handle (`curl`), e.g. `ftp://`.
#[derive(Debug, Clone)]
pub struct CurlRequest {
    /// Source URL.
    pub url: String,
    /// File to write.
    pub output: PathBuf,
}

impl CurlRequest {
    /// Render the call for the given program name.
    pub fn invocation(&self, program: &str) -> ToolInvocation {
        ToolInvocation::new(program, &self.output)
            .arg("--fail")
            .arg("--location")
            .arg("--silent")
            .arg("--show-error")
            .arg("--output")
            .path_arg(&self.output)
            .arg(self.url.clone())
    }
}
