//! Soil table generation from attribute exports and reference tables on disk.

use basinprep_tables::fsutil::{read_lines, write_text};
use basinprep_tables::{build_soil_tables, read_soil_records, SoilLookup, TableError};
use std::fs;

const ATTRIBUTES: &str = "\
SNUM,FAOSOIL,DOMSOI,PHASE1
3421.000000,Nd35-2c,Nd,
3425,Vp43-3a,Vp,
3421,Bd29-2c,Bd,
1234,Jc40-2/3a,Jc,
";

const USERSOIL: &str = "\
\"OBJECTID\",\"MUID\",\"SEQN\",\"SNAM\",\"NLAYERS\",\"HYDGRP\"
\"1\",\"\",\"1234\",\"Jc40-2/3a\",\"2\",\"C\"
\"2\",\"\",\"3000\",\"Xx1\",\"1\",\"B\"
\"3\",\"\",\"3421\",\"Nd35-2c\",\"2\",\"D\"
\"4\",\"\",\"3425\",\"Vp43-3a\",\"2\",\"D\"
";

#[test]
fn test_records_in_file_order_with_normalized_codes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clipped_attributes.csv");
    fs::write(&path, ATTRIBUTES).unwrap();

    let records = read_soil_records(&path, "SNUM", "FAOSOIL").unwrap();
    let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["3421", "3425", "3421", "1234"]);
    assert_eq!(records[0].name, "Nd35-2c");
}

#[test]
fn test_column_names_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrs.csv");
    fs::write(&path, "snum,faosoil\n7,Qc\n").unwrap();
    let records = read_soil_records(&path, "SNUM", "FAOSOIL").unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_missing_column_is_typed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrs.csv");
    fs::write(&path, "ID,NAME\n1,a\n").unwrap();
    assert!(matches!(
        read_soil_records(&path, "SNUM", "FAOSOIL"),
        Err(TableError::MissingColumn { .. })
    ));
}

#[test]
fn test_missing_export_is_typed() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        read_soil_records(dir.path().join("none.csv"), "SNUM", "FAOSOIL"),
        Err(TableError::MissingInput(_))
    ));
}

#[test]
fn test_basin_tables_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let attributes = dir.path().join("clipped_attributes.csv");
    let reference = dir.path().join("mw_usersoil.csv");
    fs::write(&attributes, ATTRIBUTES).unwrap();
    fs::write(&reference, USERSOIL).unwrap();

    let records = read_soil_records(&attributes, "SNUM", "FAOSOIL").unwrap();
    let lookup = SoilLookup::from_records(&records);
    assert_eq!(lookup.len(), 3);
    assert_eq!(lookup.get("3421"), Some("Nd35-2c"));

    let lines = read_lines(&reference).unwrap();
    let tables = build_soil_tables(&lines, &lookup);

    let usersoil_path = dir.path().join("data/tables/bn_usersoil.csv");
    let lookup_path = dir.path().join("data/tables/bn_soil_lookup.csv");
    write_text(&usersoil_path, &tables.usersoil).unwrap();
    write_text(&lookup_path, &tables.lookup).unwrap();

    assert_eq!(
        fs::read_to_string(&usersoil_path).unwrap(),
        "OBJECTID,MUID,SEQN,SNAM,NLAYERS,HYDGRP\n\
         1,,1234,Jc40-2/3a,2,C\n\
         3,,3421,Nd35-2c,2,D\n\
         4,,3425,Vp43-3a,2,D\n"
    );
    assert_eq!(
        fs::read_to_string(&lookup_path).unwrap(),
        "VALUE,SNAM\n1234,Jc40-2/3a-1234\n3421,Nd35-2c-3421\n3425,Vp43-3a-3425\n"
    );
}
