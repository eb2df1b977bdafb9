// ============================================================
// EXPORTER CONFIGURATION
// ============================================================
// Connection parameters and output options for a table dump

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::error::{AppError, Result};

/// Database engine the exporter talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    Mysql,
    Postgres,
    Sqlite,
}

impl DbEngine {
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbEngine::Mysql => Some(3306),
            DbEngine::Postgres => Some(5432),
            DbEngine::Sqlite => None,
        }
    }
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngine::Mysql => write!(f, "mysql"),
            DbEngine::Postgres => write!(f, "postgres"),
            DbEngine::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// What to do when a single table fails to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTableError {
    /// Stop the run at the first failing table
    #[default]
    Abort,

    /// Log the failure, record it in the report and move on
    Skip,
}

/// Record terminator written after every output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Crlf,
    Lf,
}

/// Configuration for an exporter run
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub engine: DbEngine,

    pub host: String,

    /// Falls back to the engine's default port when unset
    pub port: Option<u16>,

    pub user: String,

    /// Literal password, `env:NAME` or `plain:VALUE`
    pub password: String,

    /// Database name (file path for SQLite)
    pub database: String,

    /// Directory receiving one file per table
    pub output_dir: PathBuf,

    /// Extension of the per-table files, without the dot
    pub extension: String,

    /// Field delimiter, must be a single ASCII character
    pub delimiter: char,

    pub line_terminator: LineTerminator,

    pub on_table_error: OnTableError,

    pub connect_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            engine: DbEngine::Mysql,
            host: "localhost".to_string(),
            port: None,
            user: "root".to_string(),
            password: String::new(),
            database: "chinook".to_string(),
            output_dir: PathBuf::from("./exported_tables"),
            extension: "csv".to_string(),
            delimiter: ',',
            line_terminator: LineTerminator::Crlf,
            on_table_error: OnTableError::Abort,
            connect_timeout_secs: 10,
        }
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("output_dir", &self.output_dir)
            .field("extension", &self.extension)
            .field("delimiter", &self.delimiter)
            .field("line_terminator", &self.line_terminator)
            .field("on_table_error", &self.on_table_error)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl ExporterConfig {
    /// SQLite exporter reading the given database file
    pub fn sqlite(database: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine: DbEngine::Sqlite,
            database: database.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.engine.default_port())
    }

    /// Delimiter as the byte the CSV writer expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(AppError::ValidationError(format!(
                "delimiter must be a single ASCII character other than quote or newline, got {:?}",
                self.delimiter
            )));
        }
        Ok(self.delimiter as u8)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;

        if self.database.trim().is_empty() {
            return Err(AppError::ValidationError(
                "database name is required".to_string(),
            ));
        }
        if self.engine != DbEngine::Sqlite && self.host.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "host is required for {}",
                self.engine
            )));
        }
        if self.extension.is_empty()
            || self
                .extension
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '.' | '\0'))
        {
            return Err(AppError::ValidationError(format!(
                "invalid output extension: {:?}",
                self.extension
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "connect_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
