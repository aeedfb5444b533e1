//! Shared fixtures: a prepared working directory and a tool runner that
//! fabricates plausible outputs instead of calling GDAL.

#![allow(dead_code)]

use basinprep_gis::{GisError, ToolInvocation, ToolRunner};
use basinprep_runner::{PipelineConfig, ResumePolicy};
use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

// ============================================================================
// Reference data
// ============================================================================

pub const DEM_WIDTH: u32 = 6;
pub const DEM_HEIGHT: u32 = 4;
pub const DEM_ORIGIN: (f64, f64) = (3_850_000.0, 1_420_000.0);
pub const CELL: f64 = 300.0;

pub const TILES: [&str; 2] = ["srtm_44_11.zip", "srtm_43_10.zip"];
pub const LANDCOVER: &str = "ESACCI-LC-L4-LCCS-Map-300m-P1Y-2009-v2.0.7.tif";

/// Attribute export of the clipped soil layer. 6998 has no usersoil row.
pub const SOIL_ATTRIBUTES: &str = "\
SNUM,FAOSOIL,DOMSOI
3421.000000,Nd35-2c,Nd
3425,Vp43-3a,Vp
3421,Bd29-2c,Bd
6998,WR,WR
";

pub const USERSOIL: &str = "\
\"OBJECTID\",\"MUID\",\"SEQN\",\"SNAM\",\"NLAYERS\"
\"1\",\"\",\"1234\",\"Jc40-2/3a\",\"2\"
\"2\",\"\",\"3421\",\"Nd35-2c\",\"2\"
\"3\",\"\",\"3425\",\"Vp43-3a\",\"3\"
";

pub const EXPECTED_USERSOIL: &str = "\
OBJECTID,MUID,SEQN,SNAM,NLAYERS
2,,3421,Nd35-2c,2
3,,3425,Vp43-3a,3
";

pub const EXPECTED_SOIL_LOOKUP: &str = "VALUE,SNAM\n3421,Nd35-2c-3421\n3425,Vp43-3a-3425\n";

pub const LAND_LOOKUP: &str = "LANDUSE_ID,SWAT_CODE\n10,AGRL\n50,FRSE\n210,WATR\n";

// ============================================================================
// GeoTIFF writer
// ============================================================================

/// Write a north-up GeoTIFF with tiepoint/scale georeferencing.
pub fn write_geotiff(path: &Path, width: u32, height: u32, origin: (f64, f64), cell: f64, epsg: u16, nodata: Option<&str>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray16>(width, height).unwrap();

    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33550), &[cell, cell, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33922), &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..])
        .unwrap();
    let keys: [u16; 8] = [1, 1, 0, 1, 3072, 0, 1, epsg];
    image.encoder().write_tag(Tag::from_u16_exhaustive(34735), &keys[..]).unwrap();
    if let Some(nodata) = nodata {
        image.encoder().write_tag(Tag::from_u16_exhaustive(42113), nodata).unwrap();
    }

    let data = vec![0u16; (width * height) as usize];
    image.write_data(&data).unwrap();
}

fn epsg_of(srs: &str) -> u16 {
    srs.trim_start_matches("EPSG:").parse().unwrap()
}

/// The `count` values following `flag`.
fn flag_values<'a>(inv: &'a ToolInvocation, flag: &str, count: usize) -> Vec<&'a str> {
    let pos = inv.args.iter().position(|a| a == flag).unwrap();
    inv.args[pos + 1..pos + 1 + count].iter().map(String::as_str).collect()
}

// ============================================================================
// Fake runner
// ============================================================================

/// Records every invocation and writes a stand-in for its output.
#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<ToolInvocation>>,
    soil_shift: f64,
    failing_program: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize the soil map onto a grid shifted east by `shift`.
    pub fn with_soil_shift(shift: f64) -> Self {
        Self {
            soil_shift: shift,
            ..Self::default()
        }
    }

    /// Fail every call to `program`.
    pub fn failing(program: &str) -> Self {
        Self {
            failing_program: Some(program.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }

    /// gdalwarp invocations' `-r` values, in call order.
    pub fn warp_methods(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == "gdalwarp")
            .filter_map(|c| c.flag_value("-r").map(str::to_string))
            .collect()
    }

    pub fn find(&self, program: &str) -> Option<ToolInvocation> {
        self.calls.borrow().iter().find(|c| c.program == program).cloned()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, inv: &ToolInvocation) -> basinprep_gis::Result<()> {
        self.calls.borrow_mut().push(inv.clone());

        if self.failing_program.as_deref() == Some(inv.program.as_str()) {
            return Err(GisError::ToolFailed {
                program: inv.program.clone(),
                status: Some(1),
                stderr: "ERROR 4: simulated failure".to_string(),
            });
        }

        match inv.program.as_str() {
            "gdalwarp" => {
                let srs = inv.flag_value("-t_srs").unwrap();
                let nodata = inv.flag_value("-dstnodata");
                write_geotiff(&inv.output, DEM_WIDTH, DEM_HEIGHT, DEM_ORIGIN, CELL, epsg_of(srs), nodata);
            }
            "gdal_rasterize" => {
                let te: Vec<f64> = flag_values(inv, "-te", 4).iter().map(|v| v.parse().unwrap()).collect();
                let ts: Vec<u32> = flag_values(inv, "-ts", 2).iter().map(|v| v.parse().unwrap()).collect();
                let cell = (te[2] - te[0]) / ts[0] as f64;
                let srs = inv.flag_value("-a_srs").unwrap();
                write_geotiff(
                    &inv.output,
                    ts[0],
                    ts[1],
                    (te[0] + self.soil_shift, te[3]),
                    cell,
                    epsg_of(srs),
                    inv.flag_value("-a_nodata"),
                );
            }
            "ogr2ogr" if inv.flag_value("-f") == Some("CSV") => {
                assert!(!inv.output.exists(), "CSV export target must be removed first");
                fs::write(&inv.output, SOIL_ATTRIBUTES).unwrap();
            }
            _ => {
                if let Some(parent) = inv.output.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&inv.output, format!("{} output", inv.program)).unwrap();
            }
        }

        Ok(())
    }
}

// ============================================================================
// Working directory
// ============================================================================

/// A working directory holding the static inputs and already-downloaded raw
/// data, so no stage touches the network.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn new(resume: ResumePolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut config = PipelineConfig {
            work_dir: root.to_path_buf(),
            resume,
            ..PipelineConfig::default()
        };
        config.dem.tiles = TILES.iter().map(|t| t.to_string()).collect();
        // Unroutable, so an unexpected download fails instead of hanging.
        config.dem.base_url = "http://127.0.0.1:9/tiles/".to_string();
        config.soil.url = "http://127.0.0.1:9/DSMW.zip".to_string();
        config.landuse.url = format!("ftp://127.0.0.1:9/v207/{}", LANDCOVER);
        config.http_timeout_secs = 5;

        fs::write(root.join("bn_mask.gpkg"), "mask").unwrap();
        fs::write(root.join("mw_usersoil.csv"), USERSOIL).unwrap();
        fs::write(root.join("land_lookup.csv"), LAND_LOOKUP).unwrap();

        let raw = config.dem_raw_dir();
        let extracted = config.dem_extracted_dir();
        fs::create_dir_all(&raw).unwrap();
        fs::create_dir_all(&extracted).unwrap();
        for tile in TILES {
            fs::write(raw.join(tile), "zip").unwrap();
            let stem = tile.trim_end_matches(".zip");
            fs::write(extracted.join(format!("{}.tif", stem)), "tile").unwrap();
        }

        fs::create_dir_all(config.soil_dir()).unwrap();
        fs::write(config.soil_archive_path(), "zip").unwrap();
        fs::write(config.soil_shapefile_path(), "shp").unwrap();

        fs::create_dir_all(config.landuse_dir()).unwrap();
        fs::write(config.landuse_dir().join(LANDCOVER), "landcover").unwrap();

        Self { dir, config }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}
