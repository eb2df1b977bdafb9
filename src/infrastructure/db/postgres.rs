use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::source::{closed_err, query_err, quote_identifier, RowSink, TableSource};
use crate::domain::error::{AppError, Result};
use crate::domain::export::{DbEngine, ScalarValue, TableDescriptor};

/// Connection settings for a PostgreSQL server
#[derive(Clone)]
pub struct PgTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
    pub database: &'a str,
    pub connect_timeout: Duration,
}

/// Exports the `public` schema of one PostgreSQL database
pub struct PgSource {
    conn: Option<PgConnection>,
}

impl PgSource {
    pub async fn connect(target: &PgTarget<'_>) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(target.host)
            .port(target.port)
            .username(target.user)
            .password(target.password)
            .database(target.database);

        let conn = tokio::time::timeout(
            target.connect_timeout,
            PgConnection::connect_with(&options),
        )
        .await
        .map_err(|_| {
            AppError::ConnectionError(format!(
                "Connection to PostgreSQL at {}:{} timed out after {} seconds",
                target.host,
                target.port,
                target.connect_timeout.as_secs()
            ))
        })?
        .map_err(|e| {
            AppError::ConnectionError(format!("Failed to connect to PostgreSQL: {}", e))
        })?;

        info!(
            "Connected to PostgreSQL at {}:{}/{}",
            target.host, target.port, target.database
        );
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(closed_err)
    }

    fn decode_value(row: &PgRow, index: usize) -> ScalarValue {
        let type_name = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return ScalarValue::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(e) => {
                warn!("Failed to read column {}: {}", index, e);
                return ScalarValue::Null;
            }
        };

        if let Ok(v) = row.try_get::<String, _>(index) {
            return ScalarValue::Text(v);
        }
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return ScalarValue::Int(v);
        }
        if let Ok(v) = row.try_get::<i32, _>(index) {
            return ScalarValue::Int(i64::from(v));
        }
        if let Ok(v) = row.try_get::<i16, _>(index) {
            return ScalarValue::Int(i64::from(v));
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return ScalarValue::Float(v);
        }
        if let Ok(v) = row.try_get::<f32, _>(index) {
            return ScalarValue::Float(f64::from(v));
        }
        if let Ok(v) = row.try_get::<bool, _>(index) {
            return ScalarValue::Bool(v);
        }
        if let Ok(v) = row.try_get::<BigDecimal, _>(index) {
            return ScalarValue::Decimal(v);
        }
        if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
            return ScalarValue::DateTime(v.naive_utc());
        }
        if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
            return ScalarValue::DateTime(v);
        }
        if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
            return ScalarValue::Date(v);
        }
        if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
            return ScalarValue::Time(v);
        }
        if let Ok(v) = row.try_get::<uuid::Uuid, _>(index) {
            return ScalarValue::Text(v.to_string());
        }
        if let Ok(v) = row.try_get::<serde_json::Value, _>(index) {
            return ScalarValue::Json(v);
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return ScalarValue::Bytes(v);
        }

        warn!(
            "Unsupported PostgreSQL type {} in column {}, writing empty field",
            type_name, index
        );
        ScalarValue::Null
    }
}

#[async_trait]
impl TableSource for PgSource {
    fn engine(&self) -> DbEngine {
        DbEngine::Postgres
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
                AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| query_err("Failed to list tables", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("table_name")
                    .map_err(|e| query_err("Failed to parse table_name", e))
            })
            .collect()
    }

    async fn scan_table(
        &mut self,
        table: &str,
        sink: &mut dyn RowSink,
    ) -> Result<TableDescriptor> {
        let conn = self.conn()?;
        let sql = format!("SELECT * FROM public.{}", quote_identifier(table, '"'));
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
                AppError::ConnectionError(format!(
                    "Failed to close PostgreSQL connection: {}",
                    e
                ))
            })?;
            info!("Closed PostgreSQL connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::source::CollectingSink;

    const URL_VAR: &str = "SCRUBDUMP_TEST_PG_URL";

    async fn live_source() -> Option<PgSource> {
        let url = std::env::var(URL_VAR).ok()?;
        let conn = PgConnection::connect(&url).await.unwrap();
        Some(PgSource { conn: Some(conn) })
    }

    async fn execute(source: &mut PgSource, sql: &str) {
        source.conn().unwrap().execute(sql).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs SCRUBDUMP_TEST_PG_URL"]
    async fn test_scan_decodes_postgres_types() {
        let Some(mut source) = live_source().await else {
            eprintln!("{} not set, skipping", URL_VAR);
            return;
        };
        let table = format!("Scrubdump Types {}", uuid::Uuid::new_v4().simple());
        let quoted = quote_identifier(&table, '"');

        execute(
            &mut source,
            &format!(
                "CREATE TABLE public.{} (i INT4, bi INT8, b BOOL, n NUMERIC(5,1), r REAL, \
                 t TEXT, ts TIMESTAMP, d DATE, j JSONB, u UUID, by BYTEA, nu TEXT)",
                quoted
            ),
        )
        .await;
        execute(
            &mut source,
            &format!(
                "INSERT INTO public.{} VALUES (-7, 9000000000, true, 12.5, 1.5, 'hi', \
                 '2024-01-02 03:04:05', '2024-01-02', '{{\"a\": 1}}', \
                 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', '\\x0aff', NULL)",
                quoted
            ),
        )
        .await;

        let tables = source.list_tables().await.unwrap();
        let mut sink = CollectingSink::default();
        let scanned = source.scan_table(&table, &mut sink).await;
        execute(&mut source, &format!("DROP TABLE public.{}", quoted)).await;
        source.close().await.unwrap();

        assert!(tables.contains(&table));
        assert_eq!(
            scanned.unwrap().columns,
            vec!["i", "bi", "b", "n", "r", "t", "ts", "d", "j", "u", "by", "nu"]
        );
        let fields: Vec<String> = sink.rows[0].iter().map(ScalarValue::to_field).collect();
        assert_eq!(
            fields,
            vec![
                "-7",
                "9000000000",
                "True",
                "12.5",
                "1.5",
                "hi",
                "2024-01-02 03:04:05",
                "2024-01-02",
                r#"{"a":1}"#,
                "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11",
                "0aff",
                "",
            ]
        );
    }

    #[tokio::test]
    #[ignore = "needs SCRUBDUMP_TEST_PG_URL"]
    async fn test_lists_only_public_base_tables() {
        let Some(mut source) = live_source().await else {
            eprintln!("{} not set, skipping", URL_VAR);
            return;
        };
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let table = format!("scrubdump_base_{}", suffix);
        let view = format!("scrubdump_view_{}", suffix);

        execute(&mut source, &format!("CREATE TABLE public.{} (x INT)", table)).await;
        execute(
            &mut source,
            &format!("CREATE VIEW public.{} AS SELECT x FROM public.{}", view, table),
        )
        .await;

        let tables = source.list_tables().await;
        execute(&mut source, &format!("DROP VIEW public.{}", view)).await;
        execute(&mut source, &format!("DROP TABLE public.{}", table)).await;
        source.close().await.unwrap();

        let tables = tables.unwrap();
        assert!(tables.contains(&table));
        assert!(!tables.contains(&view));
    }
}
