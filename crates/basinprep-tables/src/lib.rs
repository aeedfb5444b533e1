//! # basinprep-tables
//!
//! Table generation for the hydrological model's soil inputs, plus the small
//! file helpers every stage uses.
//!
//! ## Soil tables
//!
//! The soil raster stores integer class codes. The model needs two tables to
//! interpret them:
//!
//! - a **lookup** (`VALUE,SNAM`) mapping each code to `name-code`, and
//! - a **usersoil** table: the rows of a global reference soil table whose
//!   class code occurs in the basin.
//!
//! Both are derived from the [`SoilLookup`] built by scanning the clipped soil
//! layer's records: one entry per distinct code, holding the name of the
//! first record carrying it.
//!
//! ```
//! use basinprep_tables::{build_soil_tables, SoilLookup};
//!
//! let mut lookup = SoilLookup::new();
//! lookup.insert("2", "Bd29-2c");
//! lookup.insert("3", "Be71-2c");
//!
//! let reference = vec![
//!     "\"OBJECTID\",\"MUID\",\"SEQN\",\"SNAM\"".to_string(),
//!     "1,\"X\",1,\"A\"".to_string(),
//!     "2,\"X\",2,\"B\"".to_string(),
//!     "3,\"X\",3,\"C\"".to_string(),
//! ];
//! let tables = build_soil_tables(&reference, &lookup);
//! assert_eq!(tables.lookup, "VALUE,SNAM\n2,Bd29-2c-2\n3,Be71-2c-3\n");
//! assert_eq!(tables.kept_rows, 2);
//! ```

mod error;
pub mod fsutil;
mod soil;

pub use error::TableError;
pub use soil::{
    build_soil_tables, normalize_code, read_soil_records, SoilLookup, SoilRecord, SoilTables,
    LOOKUP_HEADER,
};

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
