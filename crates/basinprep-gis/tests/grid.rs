//! GeoTIFF grid reading against small synthetic rasters.

use approx::assert_relative_eq;
use basinprep_gis::{GisError, RasterGrid};
use std::fs::File;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Write a north-up UInt16 GeoTIFF with tiepoint/scale georeferencing.
fn write_geotiff(path: &Path, width: u32, height: u32, origin: (f64, f64), cell: f64, epsg: Option<u16>) {
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
    if let Some(code) = epsg {
        let keys: [u16; 8] = [1, 1, 0, 1, 3072, 0, 1, code];
        image.encoder().write_tag(Tag::from_u16_exhaustive(34735), &keys[..]).unwrap();
    }
    image.encoder().write_tag(Tag::from_u16_exhaustive(42113), "-32768").unwrap();

    let data = vec![0u16; (width * height) as usize];
    image.write_data(&data).unwrap();
}

#[test]
fn test_read_grid_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem_test.tif");
    write_geotiff(&path, 6, 4, (3_850_000.0, 1_420_000.0), 300.0, Some(3395));

    let grid = RasterGrid::read(&path).expect("grid should be readable");
    assert_eq!((grid.width, grid.height), (6, 4));
    assert_relative_eq!(grid.geotransform[0], 3_850_000.0);
    assert_relative_eq!(grid.geotransform[1], 300.0);
    assert_relative_eq!(grid.geotransform[3], 1_420_000.0);
    assert_relative_eq!(grid.geotransform[5], -300.0);
    assert_eq!(grid.epsg, Some(3395));
    assert_eq!(grid.nodata, Some(-32768.0));

    let (xmin, ymin, xmax, ymax) = grid.extent();
    assert_relative_eq!(xmin, 3_850_000.0);
    assert_relative_eq!(ymin, 1_418_800.0);
    assert_relative_eq!(xmax, 3_851_800.0);
    assert_relative_eq!(ymax, 1_420_000.0);
}

#[test]
fn test_same_grid_rasters_are_aligned() {
    let dir = tempfile::tempdir().unwrap();
    let dem = dir.path().join("dem.tif");
    let soils = dir.path().join("soils.tif");
    write_geotiff(&dem, 8, 8, (1000.0, 5000.0), 300.0, Some(3395));
    write_geotiff(&soils, 8, 8, (1000.0, 5000.0), 300.0, Some(3395));

    let dem_grid = RasterGrid::read(&dem).unwrap();
    let soil_grid = RasterGrid::read(&soils).unwrap();
    dem_grid.ensure_aligned(&dem, &soil_grid, &soils).unwrap();
}

#[test]
fn test_shifted_raster_is_not_aligned() {
    let dir = tempfile::tempdir().unwrap();
    let dem = dir.path().join("dem.tif");
    let soils = dir.path().join("soils.tif");
    write_geotiff(&dem, 8, 8, (1000.0, 5000.0), 300.0, Some(3395));
    write_geotiff(&soils, 8, 8, (1300.0, 5000.0), 300.0, Some(3395));

    let dem_grid = RasterGrid::read(&dem).unwrap();
    let soil_grid = RasterGrid::read(&soils).unwrap();
    let err = dem_grid.ensure_aligned(&dem, &soil_grid, &soils).unwrap_err();
    assert!(matches!(err, GisError::GridMismatch { .. }));
}

#[test]
fn test_missing_srs_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_srs.tif");
    write_geotiff(&path, 2, 2, (0.0, 0.0), 1.0, None);
    assert_eq!(RasterGrid::read(&path).unwrap().epsg, None);
}

#[test]
fn test_plain_tiff_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.tif");
    let file = File::create(&path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder
        .write_image::<colortype::Gray8>(2, 2, &[0u8, 1, 2, 3])
        .unwrap();

    assert!(matches!(
        RasterGrid::read(&path),
        Err(GisError::InvalidGeoTiff { .. })
    ));
}
