//! Pipeline configuration.
//!
//! Every field has a default reproducing the Blue Nile / SWAT+ reference
//! setup, so an empty YAML document is a valid configuration. Relative paths
//! are resolved against `work_dir`.

use crate::manifest::sha256_hex;
use crate::stages::Stage;
use crate::{PipelineError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a re-run decides what can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResumePolicy {
    /// Skip a stage whose recorded outputs and inputs still hash the same.
    /// Otherwise downloads and extractions are still skipped when present,
    /// and every derived file is regenerated.
    #[default]
    Manifest,
    /// Skip each step whose output file already exists.
    Existence,
}

/// What to do when a table cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteErrorPolicy {
    /// Stop the run.
    #[default]
    Abort,
    /// Log the failure and carry on; the stage is not marked complete.
    Continue,
}

impl ResumePolicy {
    /// Name as written in the YAML file and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumePolicy::Manifest => "manifest",
            ResumePolicy::Existence => "existence",
        }
    }
}

impl WriteErrorPolicy {
    /// Name as written in the YAML file and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteErrorPolicy::Abort => "abort",
            WriteErrorPolicy::Continue => "continue",
        }
    }
}

impl fmt::Display for ResumePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WriteErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elevation tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemConfig {
    /// URL prefix the tile names are appended to.
    pub base_url: String,
    /// Tile archive names.
    pub tiles: Vec<String>,
}

impl Default for DemConfig {
    fn default() -> Self {
        Self {
            base_url: "http://srtm.csi.cgiar.org/wp-content/uploads/files/srtm_5x5/TIFF/".to_string(),
            tiles: ["srtm_44_11", "srtm_43_10", "srtm_44_10", "srtm_43_11", "srtm_44_09", "srtm_43_09"]
                .iter()
                .map(|t| format!("{}.zip", t))
                .collect(),
        }
    }
}

/// Soil map source and attribute fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    pub url: String,
    /// Local name for the downloaded archive. The URL carries no usable file name.
    pub archive_name: String,
    /// Integer class code burnt into the raster.
    pub code_field: String,
    /// Descriptive soil unit name.
    pub name_field: String,
    /// Global reference usersoil table.
    pub usersoil_table: PathBuf,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            url: "http://www.fao.org/geonetwork/srv/en/resources.get?id=14116&fname=DSMW.zip&access=private"
                .to_string(),
            archive_name: "DSMW.zip".to_string(),
            code_field: "SNUM".to_string(),
            name_field: "FAOSOIL".to_string(),
            usersoil_table: PathBuf::from("mw_usersoil.csv"),
        }
    }
}

/// Land-cover source and lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandUseConfig {
    pub url: String,
    /// Static land-use lookup copied into the tables directory.
    pub lookup_table: PathBuf,
}

impl Default for LandUseConfig {
    fn default() -> Self {
        Self {
            url: "ftp://geo10.elie.ucl.ac.be/v207/ESACCI-LC-L4-LCCS-Map-300m-P1Y-2009-v2.0.7.tif".to_string(),
            lookup_table: PathBuf::from("land_lookup.csv"),
        }
    }
}

/// Program names of the external tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub gdal_merge: String,
    pub gdalwarp: String,
    pub ogr2ogr: String,
    pub gdal_rasterize: String,
    pub curl: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gdal_merge: "gdal_merge.py".to_string(),
            gdalwarp: "gdalwarp".to_string(),
            ogr2ogr: "ogr2ogr".to_string(),
            gdal_rasterize: "gdal_rasterize".to_string(),
            curl: "curl".to_string(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the inputs; `temp/` and `data/` are created here.
    pub work_dir: PathBuf,
    /// Used in output file names.
    pub basin_name: String,
    /// Basin boundary polygon.
    pub mask: PathBuf,
    pub target_srs: String,
    /// SRS of the soil map as distributed.
    pub soil_source_srs: String,
    /// Output cell size in target SRS units.
    pub resolution: f64,
    pub nodata: f64,
    /// GDAL data type of every output raster.
    pub output_type: String,
    pub dem: DemConfig,
    pub soil: SoilConfig,
    pub landuse: LandUseConfig,
    pub tools: ToolsConfig,
    pub resume: ResumePolicy,
    pub on_write_error: WriteErrorPolicy,
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            basin_name: "blue_nile".to_string(),
            mask: PathBuf::from("bn_mask.gpkg"),
            target_srs: "EPSG:3395".to_string(),
            soil_source_srs: "EPSG:4326".to_string(),
            resolution: 300.0,
            nodata: -32768.0,
            output_type: "Int32".to_string(),
            dem: DemConfig::default(),
            soil: SoilConfig::default(),
            landuse: LandUseConfig::default(),
            tools: ToolsConfig::default(),
            resume: ResumePolicy::default(),
            on_write_error: WriteErrorPolicy::default(),
            http_timeout_secs: basinprep_fetch::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the tools would choke on.
    pub fn validate(&self) -> Result<()> {
        if self.basin_name.trim().is_empty() {
            return Err(PipelineError::Config("basin_name must not be empty".to_string()));
        }
        if self.basin_name.contains(['/', '\\']) {
            return Err(PipelineError::Config(format!(
                "basin_name '{}' must not contain path separators",
                self.basin_name
            )));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(PipelineError::Config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.dem.tiles.is_empty() {
            return Err(PipelineError::Config("dem.tiles must list at least one tile".to_string()));
        }
        if self.soil.archive_name.trim().is_empty() {
            return Err(PipelineError::Config("soil.archive_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve a configured path against the working directory.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// Basin boundary polygon.
    pub fn mask_path(&self) -> PathBuf {
        self.resolve(&self.mask)
    }

    /// Downloads and intermediate files.
    pub fn temp_dir(&self) -> PathBuf {
        self.work_dir.join("temp")
    }

    /// Root of the tree handed to the modelling tool.
    pub fn data_dir(&self) -> PathBuf {
        self.work_dir.join("data")
    }

    pub fn rasters_dir(&self) -> PathBuf {
        self.data_dir().join("rasters")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir().join("tables")
    }

    /// Record of completed stages.
    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir().join("manifest.json")
    }

    // Elevation

    /// Downloaded tile archives.
    pub fn dem_raw_dir(&self) -> PathBuf {
        self.temp_dir().join("dem").join("raw")
    }

    pub fn dem_extracted_dir(&self) -> PathBuf {
        self.temp_dir().join("dem").join("extracted")
    }

    /// Mosaic of every configured tile, before clipping.
    pub fn dem_merged_path(&self) -> PathBuf {
        self.temp_dir().join("dem").join("merged").join("srtm_data.tif")
    }

    /// Basin elevation raster. Its grid is the grid of every other output.
    pub fn dem_raster_path(&self) -> PathBuf {
        self.rasters_dir().join(format!("dem_{}.tif", self.basin_name))
    }

    // Soil

    pub fn soil_dir(&self) -> PathBuf {
        self.temp_dir().join("soil")
    }

    pub fn soil_archive_path(&self) -> PathBuf {
        self.soil_dir().join(&self.soil.archive_name)
    }

    /// Shapefile inside the soil archive, named after it.
    pub fn soil_shapefile_path(&self) -> PathBuf {
        let stem = basinprep_tables::fsutil::file_name(&self.soil.archive_name, false);
        self.soil_dir().join(format!("{}.shp", stem))
    }

    pub fn soil_reprojected_path(&self) -> PathBuf {
        let stem = basinprep_tables::fsutil::file_name(&self.soil.archive_name, false);
        self.soil_dir().join(format!("{}_reprojected.shp", stem))
    }

    /// Soil polygons clipped to the basin.
    pub fn soil_clipped_path(&self) -> PathBuf {
        self.soil_dir().join("clipped.shp")
    }

    /// Attribute table of the clipped polygons, in layer order.
    pub fn soil_attributes_path(&self) -> PathBuf {
        self.soil_dir().join("clipped_attributes.csv")
    }

    pub fn soil_raster_path(&self) -> PathBuf {
        self.rasters_dir().join(format!("soils_{}.tif", self.basin_name))
    }

    pub fn usersoil_reference_path(&self) -> PathBuf {
        self.resolve(&self.soil.usersoil_table)
    }

    /// Reference usersoil rows for the basin's soil codes.
    pub fn usersoil_output_path(&self) -> PathBuf {
        self.tables_dir().join(format!("{}_usersoil.csv", self.basin_name))
    }

    /// `VALUE,SNAM` table for the soil raster.
    pub fn soil_lookup_output_path(&self) -> PathBuf {
        self.tables_dir().join(format!("{}_soil_lookup.csv", self.basin_name))
    }

    // Land use

    pub fn landuse_dir(&self) -> PathBuf {
        self.temp_dir().join("landuse")
    }

    pub fn landuse_raster_path(&self) -> PathBuf {
        self.rasters_dir().join(format!("landuse_{}.tif", self.basin_name))
    }

    pub fn landuse_lookup_source_path(&self) -> PathBuf {
        self.resolve(&self.landuse.lookup_table)
    }

    /// Verbatim copy of the land-use lookup.
    pub fn landuse_lookup_output_path(&self) -> PathBuf {
        self.tables_dir().join(format!("{}_landuse_lookup.csv", self.basin_name))
    }

    /// Empty directories the modelling tool expects.
    pub fn scaffold_dirs(&self) -> Vec<PathBuf> {
        ["observations", "calibration", "weather", "shapefiles"]
            .iter()
            .map(|name| self.data_dir().join(name))
            .collect()
    }

    /// The settings `stage` reads, as JSON.
    ///
    /// Resume and logging options are left out: they change how a stage runs,
    /// not what it produces.
    pub fn stage_settings(&self, stage: Stage) -> serde_json::Value {
        match stage {
            Stage::Dem => serde_json::json!({
                "basin_name": self.basin_name,
                "mask": self.mask,
                "target_srs": self.target_srs,
                "resolution": self.resolution,
                "nodata": self.nodata,
                "output_type": self.output_type,
                "dem": self.dem,
                "tools": [&self.tools.gdal_merge, &self.tools.gdalwarp, &self.tools.curl],
            }),
            Stage::Soil => serde_json::json!({
                "basin_name": self.basin_name,
                "mask": self.mask,
                "target_srs": self.target_srs,
                "soil_source_srs": self.soil_source_srs,
                "nodata": self.nodata,
                "soil": self.soil,
                "tools": [&self.tools.ogr2ogr, &self.tools.gdal_rasterize, &self.tools.curl],
            }),
            Stage::Landuse => serde_json::json!({
                "basin_name": self.basin_name,
                "mask": self.mask,
                "target_srs": self.target_srs,
                "resolution": self.resolution,
                "nodata": self.nodata,
                "output_type": self.output_type,
                "landuse": self.landuse,
                "tools": [&self.tools.gdalwarp, &self.tools.curl],
            }),
            Stage::Scaffold => serde_json::json!({ "basin_name": self.basin_name }),
        }
    }

    /// Hash of [`stage_settings`](Self::stage_settings), stored in the manifest.
    pub fn settings_hash(&self, stage: Stage) -> Result<String> {
        let settings = serde_json::to_vec(&self.stage_settings(stage))?;
        Ok(sha256_hex(&settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.dem.tiles.len(), 6);
        assert_eq!(config.dem.tiles[0], "srtm_44_11.zip");
        assert_eq!(config.target_srs, "EPSG:3395");
        assert_eq!(config.nodata, -32768.0);
        assert_eq!(config.resolution, 300.0);
        assert_eq!(config.output_type, "Int32");
        assert_eq!(config.resume, ResumePolicy::Manifest);
        assert_eq!(config.on_write_error, WriteErrorPolicy::Abort);
    }

    #[test]
    fn test_settings_hash_tracks_stage_inputs() {
        let base = PipelineConfig::default();
        let hash = |config: &PipelineConfig, stage| config.settings_hash(stage).unwrap();

        let finer = PipelineConfig {
            resolution: 90.0,
            ..base.clone()
        };
        assert_ne!(hash(&base, Stage::Dem), hash(&finer, Stage::Dem));
        assert_ne!(hash(&base, Stage::Landuse), hash(&finer, Stage::Landuse));
        // The soil grid follows the elevation raster, a recorded input.
        assert_eq!(hash(&base, Stage::Soil), hash(&finer, Stage::Soil));

        let mut other_field = base.clone();
        other_field.soil.code_field = "SNUM2".to_string();
        assert_ne!(hash(&base, Stage::Soil), hash(&other_field, Stage::Soil));
        assert_eq!(hash(&base, Stage::Dem), hash(&other_field, Stage::Dem));

        let relaxed = PipelineConfig {
            resume: ResumePolicy::Existence,
            on_write_error: WriteErrorPolicy::Continue,
            http_timeout_secs: 5,
            ..base.clone()
        };
        for stage in Stage::ALL {
            assert_eq!(hash(&base, stage), hash(&relaxed, stage));
        }
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
        assert_eq!(PipelineConfig::from_yaml("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config = PipelineConfig::from_yaml(
            "basin_name: tana\nresume: existence\non_write_error: continue\ndem:\n  tiles: [srtm_44_10.zip]\n",
        )
        .unwrap();
        assert_eq!(config.basin_name, "tana");
        assert_eq!(config.resume, ResumePolicy::Existence);
        assert_eq!(config.on_write_error, WriteErrorPolicy::Continue);
        assert_eq!(config.dem.tiles, vec!["srtm_44_10.zip"]);
        // Untouched nested fields keep their defaults.
        assert_eq!(config.dem.base_url, DemConfig::default().base_url);
        assert_eq!(config.soil, SoilConfig::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = PipelineConfig::default();
        config.work_dir = PathBuf::from("/data/bn");
        config.tools.gdal_merge = "gdal_merge".to_string();
        let parsed = PipelineConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml("resolution: 0"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("basin_name: a/b"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("dem:\n  tiles: []"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("resume: sometimes"),
            Err(PipelineError::Yaml(_))
        ));
    }

    #[test]
    fn test_output_paths() {
        let config = PipelineConfig {
            work_dir: PathBuf::from("/w"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.dem_raster_path(), Path::new("/w/data/rasters/dem_blue_nile.tif"));
        assert_eq!(config.soil_raster_path(), Path::new("/w/data/rasters/soils_blue_nile.tif"));
        assert_eq!(
            config.usersoil_output_path(),
            Path::new("/w/data/tables/blue_nile_usersoil.csv")
        );
        assert_eq!(config.soil_shapefile_path(), Path::new("/w/temp/soil/DSMW.shp"));
        assert_eq!(config.mask_path(), Path::new("/w/bn_mask.gpkg"));
        assert_eq!(config.manifest_path(), Path::new("/w/temp/manifest.json"));
        assert_eq!(config.scaffold_dirs().len(), 4);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = PipelineConfig {
            work_dir: PathBuf::from("/w"),
            mask: PathBuf::from("/masks/bn.gpkg"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.mask_path(), Path::new("/masks/bn.gpkg"));
    }
}
