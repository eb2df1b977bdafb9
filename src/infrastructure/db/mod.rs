//! Source databases for the table exporter
//!
//! Each engine gets one `TableSource` implementation holding a single
//! connection for the whole run:
//! - MySQL enumerates with `SHOW TABLES`
//! - PostgreSQL enumerates base tables of the `public` schema
//! - SQLite enumerates `sqlite_master` in creation order
//!
//! Credentials are resolved from env vars when referenced as `env:NAME`.

mod mysql;
mod postgres;
mod source;
mod sqlite;

pub use mysql::{MySqlSource, MySqlTarget};
pub use postgres::{PgSource, PgTarget};
pub use source::{quote_identifier, RowSink, TableSource};
pub use sqlite::SqliteSource;

use std::time::Duration;

use crate::domain::error::{AppError, Result};
use crate::domain::export::{DbEngine, ExporterConfig};

/// Resolve a password reference
/// Format: "env:DB_PASSWORD" -> reads from DB_PASSWORD env var
/// Format: "plain:password" -> returns password directly
/// Anything else is used as the password itself
pub fn resolve_password(password_ref: &str) -> Result<String> {
    if let Some(env_key) = password_ref.strip_prefix("env:") {
        std::env::var(env_key).map_err(|_| {
            AppError::ValidationError(format!(
                "Environment variable '{}' not found for password",
                env_key
            ))
        })
    } else if let Some(password) = password_ref.strip_prefix("plain:") {
        Ok(password.to_string())
    } else {
        Ok(password_ref.to_string())
    }
}

/// Open the single connection used for a whole export run
pub async fn connect(config: &ExporterConfig) -> Result<Box<dyn TableSource>> {
    let timeout = Duration::from_secs(config.connect_timeout_secs);

    match config.engine {
        DbEngine::Mysql => {
            let password = resolve_password(&config.password)?;
            let target = MySqlTarget {
                host: &config.host,
                port: config.effective_port().unwrap_or(3306),
                user: &config.user,
                password: &password,
                database: &config.database,
                connect_timeout: timeout,
            };
            Ok(Box::new(MySqlSource::connect(&target).await?))
        }
        DbEngine::Postgres => {
            let password = resolve_password(&config.password)?;
            let target = PgTarget {
                host: &config.host,
                port: config.effective_port().unwrap_or(5432),
                user: &config.user,
                password: &password,
                database: &config.database,
                connect_timeout: timeout,
            };
            Ok(Box::new(PgSource::connect(&target).await?))
        }
        DbEngine::Sqlite => {
            let source = tokio::time::timeout(timeout, SqliteSource::connect(&config.database))
                .await
                .map_err(|_| {
                    AppError::ConnectionError(format!(
                        "Opening {} timed out after {} seconds",
                        config.database, config.connect_timeout_secs
                    ))
                })??;
            Ok(Box::new(source))
        }
    }
}
