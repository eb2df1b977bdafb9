use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::{LineSanitizer, TableExporter};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::load_config;
use crate::interfaces::cli::{Cli, Commands};

pub fn run() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sanitize(args) => {
            args.apply(&mut config.sanitizer);
            if config.sanitizer.file_paths.is_empty() {
                warn!("No files to sanitize");
                return Ok(());
            }

            let report = LineSanitizer::run(&config.sanitizer)?;
            info!(
                "Sanitized {} files, removed {} markers",
                report.files.len(),
                report.total_removed()
            );
        }
        Commands::Export(args) => {
            args.apply(&mut config.exporter);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| AppError::IoError(format!("Failed to start runtime: {}", e)))?;
            let report = runtime.block_on(TableExporter::new(config.exporter).run())?;

            info!(
                "Exported {} tables ({} rows)",
                report.tables.len(),
                report.total_rows()
            );
            if !report.is_complete() {
                warn!(
                    "{} tables skipped: {}",
                    report.failures.len(),
                    report
                        .failures
                        .iter()
                        .map(|f| f.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }

    Ok(())
}
