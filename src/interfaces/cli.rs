use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::export::{DbEngine, ExporterConfig, OnTableError};
use crate::domain::sanitizer::SanitizerConfig;

/// Strip garbage markers from text files and dump database tables to CSV
#[derive(Parser, Debug)]
#[command(name = "scrubdump", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove the marker from every line of the given files, in place
    Sanitize(SanitizeArgs),
    /// Export every table of a database to one delimited file each
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub struct SanitizeArgs {
    /// Substring to strip (default "$ ")
    #[arg(short, long)]
    pub marker: Option<String>,

    /// Files to clean; replaces the configured list when given
    pub files: Vec<PathBuf>,
}

impl SanitizeArgs {
    pub fn apply(&self, config: &mut SanitizerConfig) {
        if let Some(marker) = &self.marker {
            config.marker = marker.clone();
        }
        if !self.files.is_empty() {
            config.file_paths = self.files.clone();
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineArg {
    Mysql,
    Postgres,
    Sqlite,
}

impl From<EngineArg> for DbEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Mysql => DbEngine::Mysql,
            EngineArg::Postgres => DbEngine::Postgres,
            EngineArg::Sqlite => DbEngine::Sqlite,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnTableErrorArg {
    Abort,
    Skip,
}

impl From<OnTableErrorArg> for OnTableError {
    fn from(arg: OnTableErrorArg) -> Self {
        match arg {
            OnTableErrorArg::Abort => OnTableError::Abort,
            OnTableErrorArg::Skip => OnTableError::Skip,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    #[arg(long, value_enum)]
    pub engine: Option<EngineArg>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(short, long)]
    pub user: Option<String>,

    /// Password, `env:NAME` or `plain:VALUE`
    #[arg(short, long)]
    pub password: Option<String>,

    /// Database name, or file path for SQLite
    #[arg(short, long)]
    pub database: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Abort the run on the first failing table, or skip it and continue
    #[arg(long, value_enum)]
    pub on_table_error: Option<OnTableErrorArg>,
}

impl ExportArgs {
    pub fn apply(&self, config: &mut ExporterConfig) {
        if let Some(engine) = self.engine {
            config.engine = engine.into();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(policy) = self.on_table_error {
            config.on_table_error = policy.into();
        }
    }
}
