//! Raster grid metadata read straight from GeoTIFF tags.
//!
//! Only the first IFD's tags are read; pixel data is never decoded, so this is
//! cheap even for basin-sized rasters.

use crate::{GisError, Result};
use std::io::{Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, Limits};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;

/// GeoTIFF tags may be known variants depending on the tiff version, so
/// always resolve them through the exhaustive lookup.
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Tolerance when comparing geotransform coefficients.
const TRANSFORM_EPSILON: f64 = 1e-9;

/// Size, placement and reference system of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// GDAL-style affine transform:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    /// `pixel_height` is negative for north-up rasters.
    pub geotransform: [f64; 6],
    /// EPSG code from the GeoKey directory, if the SRS is a registered one.
    pub epsg: Option<u32>,
    /// Nodata value from the GDAL_NODATA tag.
    pub nodata: Option<f64>,
}

impl RasterGrid {
    /// Read the grid of a GeoTIFF file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        let mut limits = Limits::default();
        limits.ifd_value_size = 64 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let geotransform = Self::read_geotransform(&mut decoder, path)?;
        let epsg = Self::read_epsg(&mut decoder);
        let nodata = decoder
            .get_tag_ascii_string(geotiff_tag(GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok());

        Ok(Self {
            width,
            height,
            geotransform,
            epsg,
            nodata,
        })
    }

    /// Read the affine transform from ModelTransformation, or from
    /// ModelTiepoint + ModelPixelScale.
    fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<[f64; 6]> {
        if let Ok(m) = decoder.get_tag_f64_vec(geotiff_tag(MODEL_TRANSFORMATION)) {
            if m.len() >= 8 {
                return Ok([m[3], m[0], m[1], m[7], m[4], m[5]]);
            }
        }

        let tiepoint = decoder.get_tag_f64_vec(geotiff_tag(MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(geotiff_tag(MODEL_PIXEL_SCALE));

        match (tiepoint, pixel_scale) {
            (Ok(tie), Ok(scale)) if tie.len() >= 6 && scale.len() >= 2 => {
                // Tiepoint format: [i, j, k, x, y, z], raster (i, j) maps to model (x, y)
                let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
                let (sx, sy) = (scale[0], scale[1]);
                Ok([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy])
            }
            _ => Err(GisError::InvalidGeoTiff {
                path: path.to_path_buf(),
                reason: "no ModelTransformation or ModelTiepoint/ModelPixelScale tags".to_string(),
            }),
        }
    }

    /// Projected CS type if present, otherwise geographic type.
    fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
        let keys = decoder.get_tag_u32_vec(geotiff_tag(GEO_KEY_DIRECTORY)).ok()?;
        if keys.len() < 4 {
            return None;
        }

        // Header [version, revision, minor, count], then [key, location, count, value] entries.
        let lookup = |wanted: u32| {
            keys[4..]
                .chunks_exact(4)
                .find(|entry| entry[0] == wanted && entry[1] == 0)
                .map(|entry| entry[3])
                .filter(|code| *code != USER_DEFINED)
        };

        lookup(PROJECTED_CS_TYPE_KEY).or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
    }

    /// Bounding box as `(xmin, ymin, xmax, ymax)`, assuming no rotation.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let [x0, px, _, y0, _, py] = self.geotransform;
        let x1 = x0 + px * self.width as f64;
        let y1 = y0 + py * self.height as f64;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Describe the first difference that stops `other` from lining up with
    /// this grid cell for cell, or `None` if they match.
    pub fn mismatch(&self, other: &RasterGrid) -> Option<String> {
        if (self.width, self.height) != (other.width, other.height) {
            return Some(format!(
                "size {}x{} vs {}x{}",
                other.width, other.height, self.width, self.height
            ));
        }

        let transform_differs = self
            .geotransform
            .iter()
            .zip(other.geotransform.iter())
            .any(|(a, b)| (a - b).abs() > TRANSFORM_EPSILON);
        if transform_differs {
            return Some(format!(
                "geotransform {:?} vs {:?}",
                other.geotransform, self.geotransform
            ));
        }

        if self.epsg != other.epsg {
            return Some(format!("EPSG {:?} vs {:?}", other.epsg, self.epsg));
        }

        None
    }

    /// Check that `other` (read from `other_path`) shares this grid.
    pub fn ensure_aligned<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        reference_path: P,
        other: &RasterGrid,
        other_path: Q,
    ) -> Result<()> {
        match self.mismatch(other) {
            None => Ok(()),
            Some(detail) => Err(GisError::GridMismatch {
                reference: reference_path.as_ref().to_path_buf(),
                other: other_path.as_ref().to_path_buf(),
                detail,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RasterGrid {
        RasterGrid {
            width: 10,
            height: 5,
            geotransform: [3_800_000.0, 300.0, 0.0, 1_500_000.0, 0.0, -300.0],
            epsg: Some(3395),
            nodata: Some(-32768.0),
        }
    }

    #[test]
    fn test_extent() {
        assert_eq!(
            grid().extent(),
            (3_800_000.0, 1_498_500.0, 3_803_000.0, 1_500_000.0)
        );
    }

    #[test]
    fn test_identical_grids_match() {
        assert_eq!(grid().mismatch(&grid()), None);
    }

    #[test]
    fn test_nodata_is_not_part_of_alignment() {
        let mut other = grid();
        other.nodata = Some(0.0);
        assert_eq!(grid().mismatch(&other), None);
    }

    #[test]
    fn test_mismatches_are_described() {
        let mut other = grid();
        other.width = 11;
        assert!(grid().mismatch(&other).unwrap().starts_with("size"));

        let mut other = grid();
        other.geotransform[0] += 150.0;
        assert!(grid().mismatch(&other).unwrap().starts_with("geotransform"));

        let mut other = grid();
        other.epsg = Some(4326);
        assert!(grid().mismatch(&other).unwrap().starts_with("EPSG"));
    }

    #[test]
    fn test_ensure_aligned_error() {
        let mut other = grid();
        other.height = 6;
        let err = grid()
            .ensure_aligned("dem.tif", &other, "soils.tif")
            .unwrap_err();
        assert!(matches!(err, GisError::GridMismatch { .. }));
        assert!(err.to_string().contains("soils.tif"));
    }
}
