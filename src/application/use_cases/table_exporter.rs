//! Table Exporter
//!
//! Dumps every table of one database into `<output_dir>/<table>.<ext>`:
//! - one connection for the whole run, closed on every exit path
//! - tables exported in the order the database lists them
//! - header taken from the prepared scan, then one line per row
//!
//! A failing table either aborts the run or is skipped, per `on_table_error`.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::export::{
    validate_table_file_stem, ExportReport, ExportedTable, ExporterConfig, OnTableError, Row,
    TableFailure,
};
use crate::infrastructure::csv::{CsvOptions, TableWriter};
use crate::infrastructure::db::{self, RowSink, TableSource};
use crate::infrastructure::storage::ensure_dir;

pub struct TableExporter {
    config: ExporterConfig,
}

impl TableExporter {
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    /// Connect using the configured engine and export everything
    pub async fn run(&self) -> Result<ExportReport> {
        self.config.validate()?;
        ensure_dir(&self.config.output_dir)?;

        let source = db::connect(&self.config).await?;
        self.export_from(source).await
    }

    /// Export from an already open source, closing it afterwards whatever happens
    pub async fn export_from(&self, mut source: Box<dyn TableSource>) -> Result<ExportReport> {
        let result = self.export_all(source.as_mut()).await;

        if let Err(e) = source.close().await {
            warn!("Failed to release {} connection: {}", source.engine(), e);
        }

        if let Err(e) = &result {
            error!("Export aborted: {}", e);
        }
        result
    }

    async fn export_all(&self, source: &mut dyn TableSource) -> Result<ExportReport> {
        let options = CsvOptions::from_config(&self.config)?;

        let tables = source.list_tables().await?;
        info!("Found {} tables to export", tables.len());

        let mut report = ExportReport::default();
        for table in tables {
            match self.export_table(source, &table, &options).await {
                Ok(exported) => {
                    info!(
                        "Exported table '{}' to {}",
                        exported.name,
                        exported.path.display()
                    );
                    report.tables.push(exported);
                }
                Err(e) => match self.config.on_table_error {
                    OnTableError::Abort => return Err(e),
                    OnTableError::Skip => {
                        warn!("Skipping table '{}': {}", table, e);
                        report.failures.push(TableFailure {
                            name: table,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    async fn export_table(
        &self,
        source: &mut dyn TableSource,
        table: &str,
        options: &CsvOptions,
    ) -> Result<ExportedTable> {
        validate_table_file_stem(table)?;
        let path = self
            .config
            .output_dir
            .join(format!("{}.{}", table, self.config.extension));

        let mut sink = FileSink {
            path,
            options,
            writer: None,
        };
        let descriptor = source.scan_table(table, &mut sink).await?;
        debug!(
            "Scanned '{}' ({} columns)",
            descriptor.name,
            descriptor.columns.len()
        );

        let writer = sink.writer.take().ok_or_else(|| {
            AppError::QueryError(format!("Scan of '{}' returned no result columns", table))
        })?;
        let (path, row_count) = writer.finish()?;

        Ok(ExportedTable {
            name: table.to_string(),
            path,
            row_count,
        })
    }
}

/// Opens the output file once the scan reports its columns
struct FileSink<'a> {
    path: PathBuf,
    options: &'a CsvOptions,
    writer: Option<TableWriter>,
}

impl RowSink for FileSink<'_> {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        self.writer = Some(TableWriter::create(&self.path, self.options, columns)?);
        Ok(())
    }

    fn row(&mut self, row: Row) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_row(&row),
            None => Err(AppError::QueryError(
                "row received before result columns".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export::{DbEngine, ScalarValue, TableDescriptor};
    use async_trait::async_trait;
    use csv::ReaderBuilder;
    use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
    use sqlx::Connection;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    async fn seed(path: &Path, statements: &[&str]) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        for statement in statements {
            sqlx::query(statement).execute(&mut conn).await.unwrap();
        }
        conn.close().await.unwrap();
    }

    fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = ReaderBuilder::new().from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        (headers, rows)
    }

    fn sqlite_exporter(db: &Path, out: &Path) -> TableExporter {
        TableExporter::new(ExporterConfig::sqlite(db.to_str().unwrap(), out))
    }

    /// In-memory source that can fail chosen tables and records whether it was closed
    struct ScriptedSource {
        tables: Vec<(String, Vec<String>, Vec<Row>)>,
        failing: Vec<String>,
        fail_listing: bool,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(closed: Arc<AtomicBool>) -> Self {
            Self {
                tables: Vec::new(),
                failing: Vec::new(),
                fail_listing: false,
                closed,
            }
        }

        fn table(mut self, name: &str, columns: &[&str], rows: Vec<Row>) -> Self {
            self.tables.push((
                name.to_string(),
                columns.iter().map(|c| c.to_string()).collect(),
                rows,
            ));
            self
        }

        fn failing(mut self, name: &str) -> Self {
            self.failing.push(name.to_string());
            self
        }
    }

    #[async_trait]
    impl TableSource for ScriptedSource {
        fn engine(&self) -> DbEngine {
            DbEngine::Sqlite
        }

        async fn list_tables(&mut self) -> Result<Vec<String>> {
            if self.fail_listing {
                return Err(AppError::QueryError("listing failed".to_string()));
            }
            Ok(self.tables.iter().map(|t| t.0.clone()).collect())
        }

        async fn scan_table(
            &mut self,
            table: &str,
            sink: &mut dyn RowSink,
        ) -> Result<TableDescriptor> {
            if self.failing.iter().any(|t| t == table) {
                return Err(AppError::QueryError(format!("scan of {} failed", table)));
            }
            let (name, columns, rows) = self
                .tables
                .iter()
                .find(|t| t.0 == table)
                .cloned()
                .ok_or_else(|| AppError::QueryError(format!("no table {}", table)))?;
            sink.begin(&columns)?;
            for row in rows {
                sink.row(row)?;
            }
            Ok(TableDescriptor { name, columns })
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_exports_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("source.db");
        let out = dir.path().join("exported_tables");
        seed(
            &db,
            &[
                "CREATE TABLE T1 (colA INTEGER, colB TEXT)",
                "CREATE TABLE T2 (colX REAL)",
                "INSERT INTO T1 VALUES (1, 'one'), (2, 'two'), (3, NULL)",
                "INSERT INTO T2 VALUES (0.5)",
            ],
        )
        .await;

        let report = sqlite_exporter(&db, &out).run().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.tables.len(), 2);
        assert_eq!(report.total_rows(), 4);
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);

        let (headers, rows) = read_csv(&out.join("T1.csv"));
        assert_eq!(headers, vec!["colA", "colB"]);
        assert_eq!(
            rows,
            vec![
                vec!["1".to_string(), "one".to_string()],
                vec!["2".to_string(), "two".to_string()],
                vec!["3".to_string(), String::new()],
            ]
        );

        let (headers, rows) = read_csv(&out.join("T2.csv"));
        assert_eq!(headers, vec!["colX"]);
        assert_eq!(rows, vec![vec!["0.5".to_string()]]);
    }

    #[tokio::test]
    async fn test_empty_table_gets_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("empty.db");
        let out = dir.path().join("out");
        seed(&db, &["CREATE TABLE Playlist (PlaylistId INTEGER, Name TEXT)"]).await;

        let report = sqlite_exporter(&db, &out).run().await.unwrap();

        assert_eq!(report.tables[0].row_count, 0);
        assert_eq!(
            fs::read_to_string(out.join("Playlist.csv")).unwrap(),
            "PlaylistId,Name\r\n"
        );
    }

    #[tokio::test]
    async fn test_delimiter_in_value_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("quotes.db");
        let out = dir.path().join("out");
        let tricky = "AC/DC, \"Live\"\nat Donington";
        seed(&db, &["CREATE TABLE Artist (Name TEXT)"]).await;

        let options = SqliteConnectOptions::new().filename(&db);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query("INSERT INTO Artist VALUES (?)")
            .bind(tricky)
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();

        sqlite_exporter(&db, &out).run().await.unwrap();

        let (_, rows) = read_csv(&out.join("Artist.csv"));
        assert_eq!(rows, vec![vec![tricky.to_string()]]);
    }

    #[tokio::test]
    async fn test_overwrites_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("again.db");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("Genre.csv"), "stale content that is longer\r\n").unwrap();
        seed(
            &db,
            &["CREATE TABLE Genre (Name TEXT)", "INSERT INTO Genre VALUES ('Rock')"],
        )
        .await;

        sqlite_exporter(&db, &out).run().await.unwrap();

        assert_eq!(
            fs::read_to_string(out.join("Genre.csv")).unwrap(),
            "Name\r\nRock\r\n"
        );
    }

    #[tokio::test]
    async fn test_connection_failure_aborts_before_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let result = sqlite_exporter(&dir.path().join("missing.db"), &out)
            .run()
            .await;

        assert!(matches!(result, Err(AppError::ConnectionError(_))));
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_failing_table() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource::new(closed.clone())
            .table("a", &["x"], vec![vec![ScalarValue::Int(1)]])
            .table("b", &["y"], vec![])
            .table("c", &["z"], vec![])
            .failing("b");

        let exporter = TableExporter::new(ExporterConfig::sqlite("unused", dir.path()));
        let result = exporter.export_from(Box::new(source)).await;

        assert!(matches!(result, Err(AppError::QueryError(_))));
        assert!(closed.load(Ordering::SeqCst));
        assert!(dir.path().join("a.csv").exists());
        assert!(!dir.path().join("b.csv").exists());
        assert!(!dir.path().join("c.csv").exists());
    }

    #[tokio::test]
    async fn test_skip_policy_continues_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource::new(closed.clone())
            .table("a", &["x"], vec![vec![ScalarValue::Int(1)]])
            .table("b", &["y"], vec![])
            .table("c", &["z"], vec![vec![ScalarValue::from("zz")]])
            .failing("b");

        let config = ExporterConfig {
            on_table_error: OnTableError::Skip,
            ..ExporterConfig::sqlite("unused", dir.path())
        };
        let report = TableExporter::new(config)
            .export_from(Box::new(source))
            .await
            .unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(
            report.tables.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "b");
        assert!(!report.is_complete());
        assert!(dir.path().join("c.csv").exists());
    }

    #[tokio::test]
    async fn test_unsafe_table_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let source =
            ScriptedSource::new(closed.clone()).table("../escape", &["x"], vec![]);

        let exporter = TableExporter::new(ExporterConfig::sqlite("unused", dir.path()));
        let result = exporter.export_from(Box::new(source)).await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(!dir.path().parent().unwrap().join("escape.csv").exists());
    }

    #[tokio::test]
    async fn test_connection_closed_when_listing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource::new(closed.clone());
        source.fail_listing = true;

        let exporter = TableExporter::new(ExporterConfig::sqlite("unused", dir.path()));
        let result = exporter.export_from(Box::new(source)).await;

        assert!(matches!(result, Err(AppError::QueryError(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_custom_extension_and_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource::new(closed).table(
            "Invoice",
            &["Id", "Total"],
            vec![vec![ScalarValue::Int(1), ScalarValue::Float(1.98)]],
        );

        let config = ExporterConfig {
            extension: "tsv".to_string(),
            delimiter: '\t',
            line_terminator: crate::domain::export::LineTerminator::Lf,
            ..ExporterConfig::sqlite("unused", dir.path())
        };
        TableExporter::new(config)
            .export_from(Box::new(source))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("Invoice.tsv")).unwrap(),
            "Id\tTotal\n1\t1.98\n"
        );
    }
}
