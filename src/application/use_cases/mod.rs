pub mod line_sanitizer;
pub mod table_exporter;
