//! Soil lookup and usersoil table generation.

use crate::{Result, TableError};
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Header of the soil lookup table.
pub const LOOKUP_HEADER: &str = "VALUE,SNAM";

/// One record of the soil vector layer's attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoilRecord {
    /// Class code burnt into the raster, as text.
    pub code: String,
    /// Descriptive soil unit name.
    pub name: String,
}

/// Render a class code the way it appears in the reference table.
///
/// Attribute exports may write integer fields as reals (`3421.000000`);
/// whole numbers are reduced to their integer form.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.parse::<i64>().is_ok() {
        return trimmed.to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        _ => trimmed.to_string(),
    }
}

/// Read soil records from a CSV attribute export, in file order.
///
/// Column names are matched case-insensitively.
pub fn read_soil_records<P: AsRef<Path>>(path: P, code_field: &str, name_field: &str) -> Result<Vec<SoilRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TableError::MissingInput(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |field: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(field))
            .ok_or_else(|| TableError::MissingColumn {
                path: path.to_path_buf(),
                column: field.to_string(),
            })
    };
    let code_idx = column(code_field)?;
    let name_idx = column(name_field)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let code = normalize_code(row.get(code_idx).unwrap_or_default());
        if code.is_empty() {
            continue;
        }
        records.push(SoilRecord {
            code,
            name: row.get(name_idx).unwrap_or_default().trim().to_string(),
        });
    }

    debug!("Read {} soil records from {}", records.len(), path.display());
    Ok(records)
}

/// Mapping from soil class code to the name of its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct SoilLookup {
    names: HashMap<String, String>,
    /// Codes in first-seen order.
    order: Vec<String>,
}

impl SoilLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lookup by scanning records in order.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SoilRecord>,
    {
        let mut lookup = Self::new();
        for record in records {
            lookup.insert(&record.code, &record.name);
        }
        lookup
    }

    /// Record `name` for `code` unless the code is already known.
    /// Returns `true` if the entry was added.
    pub fn insert(&mut self, code: &str, name: &str) -> bool {
        if self.names.contains_key(code) {
            return false;
        }
        self.names.insert(code.to_string(), name.to_string());
        self.order.push(code.to_string());
        true
    }

    /// Name recorded for `code`.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Number of distinct codes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Codes in first-seen order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Generated soil tables for one basin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoilTables {
    /// Reference table header plus matching rows, quotes removed.
    pub usersoil: String,
    /// `VALUE,SNAM` lookup.
    pub lookup: String,
    /// Number of reference rows kept.
    pub kept_rows: usize,
    /// Basin codes with no row in the reference table. They appear in the
    /// soil raster but in neither table.
    pub missing_codes: Vec<String>,
}

/// Filter the reference usersoil lines down to the basin's codes and build the
/// lookup table alongside.
///
/// Each line has its double quotes stripped and is kept when its third
/// comma-separated field is a lookup code. Row order follows the reference
/// table. The lookup gets one `code,name-code` line per code, from the first
/// matching row.
pub fn build_soil_tables(reference_lines: &[String], lookup: &SoilLookup) -> SoilTables {
    let mut usersoil = String::new();
    let mut lookup_text = format!("{}\n", LOOKUP_HEADER);
    let mut emitted: HashSet<String> = HashSet::new();
    let mut kept_rows = 0;

    let Some((header, rows)) = reference_lines.split_first() else {
        return SoilTables {
            usersoil,
            lookup: lookup_text,
            kept_rows,
            missing_codes: lookup.codes().map(str::to_string).collect(),
        };
    };

    usersoil.push_str(&header.replace('"', ""));
    usersoil.push('\n');

    for line in rows {
        let line = line.replace('"', "");
        let Some(code) = line.split(',').nth(2).map(str::trim) else {
            continue;
        };
        let Some(name) = lookup.get(code) else {
            continue;
        };

        usersoil.push_str(&line);
        usersoil.push('\n');
        kept_rows += 1;

        if emitted.insert(code.to_string()) {
            lookup_text.push_str(&format!("{},{}-{}\n", code, name, code));
        }
    }

    let missing_codes: Vec<String> = lookup
        .codes()
        .filter(|code| !emitted.contains(*code))
        .map(str::to_string)
        .collect();
    if !missing_codes.is_empty() {
        warn!(
            "{} soil code(s) in the basin have no reference row and are left out of both tables: {}",
            missing_codes.len(),
            missing_codes.join(", ")
        );
    }

    SoilTables {
        usersoil,
        lookup: lookup_text,
        kept_rows,
        missing_codes,
    }
}
