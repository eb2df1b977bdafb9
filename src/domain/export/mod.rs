// ============================================================
// TABLE EXPORT DOMAIN LAYER
// ============================================================
// Core types for dumping database tables to delimited files
// No I/O, no async

mod config;
mod report;
mod value;

pub use config::{DbEngine, ExporterConfig, LineTerminator, OnTableError};
pub use report::{ExportReport, ExportedTable, TableFailure};
pub use value::ScalarValue;

use crate::domain::error::{AppError, Result};

/// A table as seen by one scan: its name and the ordered result columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<String>,
}

/// Ordered cells of one returned row
pub type Row = Vec<ScalarValue>;

/// Check that a table name can be used verbatim as the stem of an output file
pub fn validate_table_file_stem(name: &str) -> Result<()> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

    if unsafe_name {
        return Err(AppError::ValidationError(format!(
            "table name {:?} is not usable as a file name",
            name
        )));
    }
    Ok(())
}
