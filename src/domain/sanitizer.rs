// ============================================================
// LINE SANITIZER TYPES
// ============================================================
// Configuration and outcome of a marker-stripping pass

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{AppError, Result};

/// Garbage token left behind by the upstream spreadsheet export
pub const DEFAULT_MARKER: &str = "$ ";

/// Configuration for a sanitizer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Files to clean, processed in order
    pub file_paths: Vec<PathBuf>,

    /// Substring removed from every line
    pub marker: String,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            file_paths: Vec::new(),
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl SanitizerConfig {
    pub fn new(file_paths: Vec<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            file_paths,
            marker: marker.into(),
        }
    }

    /// Reject markers that cannot be stripped line by line
    pub fn validate(&self) -> Result<()> {
        validate_marker(&self.marker)
    }
}

pub fn validate_marker(marker: &str) -> Result<()> {
    if marker.is_empty() {
        return Err(AppError::ValidationError(
            "marker must not be empty".to_string(),
        ));
    }
    if marker.contains('\n') {
        return Err(AppError::ValidationError(
            "marker must not contain a newline".to_string(),
        ));
    }
    Ok(())
}

/// Outcome of cleaning a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedFile {
    pub path: PathBuf,

    /// Number of lines read (and written)
    pub lines: usize,

    /// Total marker occurrences removed
    pub removed: usize,
}

/// Outcome of a whole sanitizer run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub files: Vec<SanitizedFile>,
}

impl SanitizeReport {
    pub fn total_removed(&self) -> usize {
        self.files.iter().map(|f| f.removed).sum()
    }
}
