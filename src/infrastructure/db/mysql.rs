use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::source::{closed_err, query_err, quote_identifier, RowSink, TableSource};
use crate::domain::error::{AppError, Result};
use crate::domain::export::{DbEngine, ScalarValue, TableDescriptor};

/// Connection settings for a MySQL server
#[derive(Clone)]
pub struct MySqlTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
    pub database: &'a str,
    pub connect_timeout: Duration,
}

pub struct MySqlSource {
    conn: Option<MySqlConnection>,
}

impl MySqlSource {
    pub async fn connect(target: &MySqlTarget<'_>) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(target.host)
            .port(target.port)
            .username(target.user)
            .password(target.password)
            .database(target.database);

        let conn = tokio::time::timeout(
            target.connect_timeout,
            MySqlConnection::connect_with(&options),
        )
        .await
        .map_err(|_| {
            AppError::ConnectionError(format!(
                "Connection to MySQL at {}:{} timed out after {} seconds",
                target.host,
                target.port,
                target.connect_timeout.as_secs()
            ))
        })?
        .map_err(|e| AppError::ConnectionError(format!("Failed to connect to MySQL: {}", e)))?;

        info!(
            "Connected to MySQL at {}:{}/{}",
            target.host, target.port, target.database
        );
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn.as_mut().ok_or_else(closed_err)
    }

    /// Extract a column value, trying types in order of likelihood
    fn decode_value(row: &MySqlRow, index: usize) -> ScalarValue {
        let type_name = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return ScalarValue::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(e) => {
                warn!("Failed to read column {}: {}", index, e);
                return ScalarValue::Null;
            }
        };

        // Neither type is accepted by the checked decoders
        match type_name.as_str() {
            "YEAR" => {
                if let Ok(v) = row.try_get_unchecked::<u16, _>(index) {
                    return ScalarValue::UInt(u64::from(v));
                }
            }
            "BIT" => {
                if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(index) {
                    return ScalarValue::UInt(bit_value(&v));
                }
            }
            _ => {}
        }

        if let Ok(v) = row.try_get::<String, _>(index) {
            return ScalarValue::Text(v);
        }
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return ScalarValue::Int(v);
        }
        if let Ok(v) = row.try_get::<u64, _>(index) {
            return ScalarValue::UInt(v);
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return ScalarValue::Float(v);
        }
        if let Ok(v) = row.try_get::<f32, _>(index) {
            return ScalarValue::Float(f64::from(v));
        }
        if let Ok(v) = row.try_get::<BigDecimal, _>(index) {
            return ScalarValue::Decimal(v);
        }
        if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
            return ScalarValue::DateTime(v);
        }
        if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
            return ScalarValue::DateTime(v.naive_utc());
        }
        if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
            return ScalarValue::Date(v);
        }
        if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
            return ScalarValue::Time(v);
        }
        if let Ok(v) = row.try_get::<serde_json::Value, _>(index) {
            return ScalarValue::Json(v);
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return ScalarValue::Bytes(v);
        }
        if let Ok(v) = row.try_get_unchecked::<String, _>(index) {
            return ScalarValue::Text(v);
        }

        warn!(
            "Unsupported MySQL type {} in column {}, writing empty field",
            type_name, index
        );
        ScalarValue::Null
    }
}

/// `BIT(n)` arrives as big-endian bytes
fn bit_value(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))
}

#[async_trait]
impl TableSource for MySqlSource {
    fn engine(&self) -> DbEngine {
        DbEngine::Mysql
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let rows = sqlx::query("SHOW TABLES")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| query_err("Failed to list tables", e))?;

        // Binary collations report the name as VARBINARY
        rows.iter()
            .map(|row| match row.try_get::<String, _>(0) {
                Ok(name) => Ok(name),
                Err(_) => row
                    .try_get::<Vec<u8>, _>(0)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .map_err(|e| query_err("Failed to parse table name", e)),
            })
            .collect()
    }

    async fn scan_table(
        &mut self,
        table: &str,
        sink: &mut dyn RowSink,
    ) -> Result<TableDescriptor> {
        let conn = self.conn()?;
        let sql = format!("SELECT * FROM {}", quote_identifier(table, '`'));
        debug!("Executing: {}", sql);

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
                AppError::ConnectionError(format!("Failed to close MySQL connection: {}", e))
            })?;
            info!("Closed MySQL connection");
        }
        Ok(())
    }
}
