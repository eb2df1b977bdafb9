use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, Statement, ValueRef};
use tracing::{debug, warn};

use super::source::{closed_err, query_err, quote_identifier, RowSink, TableSource};
use crate::domain::error::{AppError, Result};
use crate::domain::export::{DbEngine, ScalarValue, TableDescriptor};

/// Read-only connection to a SQLite database file
pub struct SqliteSource {
    conn: Option<SqliteConnection>,
}

impl SqliteSource {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let conn = SqliteConnection::connect_with(&options).await.map_err(|e| {
            AppError::ConnectionError(format!("Failed to open SQLite database {}: {}", path, e))
        })?;

        debug!("Opened SQLite database {}", path);
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn.as_mut().ok_or_else(closed_err)
    }

    /// SQLite values carry their own storage class, so the declared column type is ignored
    fn decode_value(row: &SqliteRow, index: usize) -> ScalarValue {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return ScalarValue::Null,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read column {}: {}", index, e);
                return ScalarValue::Null;
            }
        }

        if let Ok(v) = row.try_get::<i64, _>(index) {
            return ScalarValue::Int(v);
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return ScalarValue::Float(v);
        }
        if let Ok(v) = row.try_get::<String, _>(index) {
            return ScalarValue::Text(v);
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return ScalarValue::Bytes(v);
        }

        warn!("Unsupported SQLite value in column {}, writing empty field", index);
        ScalarValue::Null
    }
}

#[async_trait]
impl TableSource for SqliteSource {
    fn engine(&self) -> DbEngine {
        DbEngine::Sqlite
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY rowid",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| query_err("Failed to list tables", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| query_err("Failed to parse table name", e))
            })
            .collect()
    }

    async fn scan_table(
        &mut self,
        table: &str,
        sink: &mut dyn RowSink,
    ) -> Result<TableDescriptor> {
        let conn = self.conn()?;
        let sql = format!("SELECT * FROM {}", quote_identifier(table, '"'));

        let statement = (&mut *conn)
            .prepare(&sql)
            .await
            .map_err(|e| query_err(&format!("Failed to prepare scan of '{}'", table), e))?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        sink.begin(&columns)?;

        let mut rows = statement.query().fetch(&mut *conn);
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| query_err(&format!("Failed to scan '{}'", table), e))?
        {
            let values = (0..columns.len())
                .map(|i| Self::decode_value(&row, i))
                .collect();
            sink.row(values)?;
        }

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(|e| {
                AppError::ConnectionError(format!("Failed to close SQLite connection: {}", e))
            })?;
        }
        Ok(())
    }
}
