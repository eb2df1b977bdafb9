// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Delimited text output for exported tables

mod table_writer;

pub use table_writer::{CsvOptions, TableWriter};
