use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A table written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedTable {
    pub name: String,
    pub path: PathBuf,
    pub row_count: usize,
}

/// A table that failed while `on_table_error = skip`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub tables: Vec<ExportedTable>,
    pub failures: Vec<TableFailure>,
}

impl ExportReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.row_count).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
