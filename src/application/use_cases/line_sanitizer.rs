// ============================================================
// LINE SANITIZER USE CASE
// ============================================================
// Strip a garbage marker from every line of a file, replacing it atomically

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::domain::error::{AppError, Result};
use crate::domain::sanitizer::{validate_marker, SanitizeReport, SanitizedFile, SanitizerConfig};
use crate::infrastructure::storage::StagedFile;

/// Removes one fixed marker from text files
pub struct LineSanitizer {
    marker: Vec<u8>,
}

impl LineSanitizer {
    pub fn new(marker: &str) -> Result<Self> {
        validate_marker(marker)?;
        Ok(Self {
            marker: marker.as_bytes().to_vec(),
        })
    }

    /// Clean every configured file in order, stopping at the first failure
    pub fn run(config: &SanitizerConfig) -> Result<SanitizeReport> {
        config.validate()?;
        let sanitizer = Self::new(&config.marker)?;

        let mut report = SanitizeReport::default();
        for path in &config.file_paths {
            report.files.push(sanitizer.sanitize_file(path)?);
        }
        Ok(report)
    }

    /// Clean a single file in place
    pub fn sanitize_file(&self, path: &Path) -> Result<SanitizedFile> {
        let outcome = self.stage(path)?.commit()?;
        info!("Cleaned and saved: {}", path.display());
        Ok(outcome)
    }

    /// Write the cleaned copy next to `path` without replacing it yet
    pub fn stage(&self, path: &Path) -> Result<StagedSanitize> {
        let input = File::open(path)
            .map_err(|e| AppError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(input);

        let mut staged = StagedFile::create(path)?;
        staged.inherit_permissions(path)?;

        let mut line = Vec::new();
        let mut lines = 0;
        let mut removed = 0;

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).map_err(|e| {
                AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            if read == 0 {
                break;
            }

            let (cleaned, count) = strip_marker(&line, &self.marker);
            staged.write_all(&cleaned).map_err(|e| {
                AppError::IoError(format!(
                    "Failed to write {}: {}",
                    staged.tmp_path().display(),
                    e
                ))
            })?;

            lines += 1;
            removed += count;
        }

        debug!(
            "Staged {} ({} lines, {} markers removed)",
            path.display(),
            lines,
            removed
        );

        Ok(StagedSanitize {
            staged,
            outcome: SanitizedFile {
                path: path.to_path_buf(),
                lines,
                removed,
            },
        })
    }
}

/// A fully written cleaned copy waiting to replace the original.
/// Dropping it leaves the original untouched.
pub struct StagedSanitize {
    staged: StagedFile,
    outcome: SanitizedFile,
}

impl StagedSanitize {
    pub fn outcome(&self) -> &SanitizedFile {
        &self.outcome
    }

    pub fn tmp_path(&self) -> &Path {
        self.staged.tmp_path()
    }

    pub fn commit(self) -> Result<SanitizedFile> {
        self.staged.commit()?;
        Ok(self.outcome)
    }
}

/// Remove `marker` from `line` until none is left.
///
/// A single left-to-right pass can splice a new occurrence together
/// (`"$$  "` with marker `"$ "`), so passes repeat until nothing matches.
pub fn strip_marker(line: &[u8], marker: &[u8]) -> (Vec<u8>, usize) {
    let mut current = line.to_vec();
    let mut total = 0;

    loop {
        let mut next = Vec::with_capacity(current.len());
        let count = strip_once(&current, marker, &mut next);
        if count == 0 {
            return (current, total);
        }
        total += count;
        current = next;
    }
}

fn strip_once(line: &[u8], marker: &[u8], out: &mut Vec<u8>) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < line.len() {
        if line[i..].starts_with(marker) {
            i += marker.len();
            count += 1;
        } else {
            out.push(line[i]);
            i += 1;
        }
    }
    count
}
