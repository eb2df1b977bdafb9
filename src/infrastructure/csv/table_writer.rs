// ============================================================
// TABLE WRITER
// ============================================================
// Write one table (header + rows) to a delimited file atomically

use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};

use crate::domain::error::{AppError, Result};
use crate::domain::export::{ExporterConfig, LineTerminator, ScalarValue};
use crate::infrastructure::storage::StagedFile;

/// Output format options for exported tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub terminator: LineTerminator,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            terminator: LineTerminator::Crlf,
        }
    }
}

impl CsvOptions {
    pub fn from_config(config: &ExporterConfig) -> Result<Self> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            terminator: config.line_terminator,
        })
    }

    fn builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .terminator(match self.terminator {
                LineTerminator::Crlf => Terminator::CRLF,
                LineTerminator::Lf => Terminator::Any(b'\n'),
            });
        builder
    }
}

/// Streams rows of a single table into `<path>`; nothing appears at `<path>`
/// until [`TableWriter::finish`] succeeds.
pub struct TableWriter {
    writer: Writer<StagedFile>,
    rows: usize,
}

impl TableWriter {
    pub fn create(path: &Path, options: &CsvOptions, columns: &[String]) -> Result<Self> {
        let staged = StagedFile::create(path)?;
        let mut writer = options.builder().from_writer(staged);
        writer.write_record(columns)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_row(&mut self, row: &[ScalarValue]) -> Result<()> {
        self.writer
            .write_record(row.iter().map(ScalarValue::to_field))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flush and move the file into place, returning its path and row count
    pub fn finish(self) -> Result<(PathBuf, usize)> {
        let rows = self.rows;
        let staged = self.writer.into_inner().map_err(|e| {
            AppError::IoError(format!("Failed to flush CSV writer: {}", e.error()))
        })?;
        let path = staged.commit()?;
        Ok((path, rows))
    }
}
