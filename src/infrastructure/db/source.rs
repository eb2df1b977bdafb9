use async_trait::async_trait;

use crate::domain::error::{AppError, Result};
use crate::domain::export::{DbEngine, Row, TableDescriptor};

/// Receives one table scan as it streams off the connection
pub trait RowSink: Send {
    /// Called once with the result columns, before any row
    fn begin(&mut self, columns: &[String]) -> Result<()>;

    fn row(&mut self, row: Row) -> Result<()>;
}

/// A single open connection to the database being exported
#[async_trait]
pub trait TableSource: Send {
    fn engine(&self) -> DbEngine;

    /// Table names in the order the database reports them
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Run `SELECT *` on `table`, streaming the result into `sink`
    async fn scan_table(&mut self, table: &str, sink: &mut dyn RowSink)
        -> Result<TableDescriptor>;

    /// Release the connection. Later calls fail with `ConnectionError`.
    async fn close(&mut self) -> Result<()>;
}

/// Wrap an identifier in `quote`, doubling any embedded quote characters
pub fn quote_identifier(name: &str, quote: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(quote);
    for c in name.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}

pub(crate) fn closed_err() -> AppError {
    AppError::ConnectionError("connection already closed".to_string())
}

pub(crate) fn query_err(context: &str, err: sqlx::Error) -> AppError {
    AppError::QueryError(format!("{}: {}", context, err))
}

/// Sink that keeps everything in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CollectingSink {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[cfg(test)]
impl RowSink for CollectingSink {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn row(&mut self, row: Row) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }
}
